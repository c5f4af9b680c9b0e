use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::students::bulk_names;
use crate::ipc::helpers::{get_optional_str, get_required_str, with_db};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn dormitories_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "dormitories": store::list_dormitories(conn)? }))
}

fn dormitories_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    Ok(json!({ "dormitory": store::insert_dormitory(conn, &name)? }))
}

fn dormitories_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let dormitory_id = get_required_str(params, "dormitoryId")?;
    store::delete_dormitory(conn, &dormitory_id)?;
    Ok(json!({ "ok": true }))
}

fn dormitory_students_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let dormitory_id = get_optional_str(params, "dormitoryId");
    let students = store::list_dormitory_students(conn, dormitory_id.as_deref())?;
    Ok(json!({ "students": students }))
}

fn dormitory_students_bulk_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let dormitory_id = get_required_str(params, "dormitoryId")?;
    let names = bulk_names(params)?;
    let students = store::insert_dormitory_students_bulk(conn, &names, &dormitory_id)?;
    Ok(json!({ "created": students.len(), "students": students }))
}

fn dormitory_students_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let removed = store::delete_dormitory_student(conn, &student_id)?;
    Ok(json!({ "ok": true, "permissionsDeleted": removed }))
}

fn dormitory_permissions_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_optional_str(params, "date").unwrap_or_default();
    let description = get_optional_str(params, "description").unwrap_or_default();
    let permission = store::insert_dormitory_permission(conn, &student_id, &date, &description)?;
    Ok(json!({ "permission": permission }))
}

fn dormitory_permissions_available(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let dormitory_id = get_required_str(params, "dormitoryId")?;
    let date = store::parse_date(get_optional_str(params, "date").as_deref())?;
    let students = store::available_dormitory_students(conn, &dormitory_id, &date)?;
    let today = store::list_dormitory_permissions_on(conn, &date)?;
    Ok(json!({
        "date": date,
        "students": students,
        "permissions": today
    }))
}

fn dormitory_permissions_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let permission_id = get_required_str(params, "permissionId")?;
    store::delete_dormitory_permission(conn, &permission_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dormitories.list" => Some(with_db(state, req, dormitories_list)),
        "dormitories.create" => Some(with_db(state, req, dormitories_create)),
        "dormitories.delete" => Some(with_db(state, req, dormitories_delete)),
        "dormitoryStudents.list" => Some(with_db(state, req, dormitory_students_list)),
        "dormitoryStudents.bulkCreate" => Some(with_db(state, req, dormitory_students_bulk_create)),
        "dormitoryStudents.delete" => Some(with_db(state, req, dormitory_students_delete)),
        "dormitoryPermissions.create" => Some(with_db(state, req, dormitory_permissions_create)),
        "dormitoryPermissions.available" => {
            Some(with_db(state, req, dormitory_permissions_available))
        }
        "dormitoryPermissions.delete" => Some(with_db(state, req, dormitory_permissions_delete)),
        _ => None,
    }
}
