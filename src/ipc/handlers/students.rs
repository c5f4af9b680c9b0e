use crate::bulk;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_class_name, get_optional_str, get_required_str, with_db};
use crate::ipc::types::{AppState, Request};
use crate::model::ClassName;
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn students_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_name = match get_optional_str(params, "className") {
        Some(raw) => Some(
            ClassName::parse(&raw)
                .ok_or_else(|| HandlerErr::bad_params(format!("unknown class: {}", raw)))?,
        ),
        None => None,
    };
    let students = store::list_students(conn, class_name)?;
    Ok(json!({ "students": students }))
}

fn students_search(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let query = get_optional_str(params, "query").unwrap_or_default();
    Ok(json!({ "students": store::search_students(conn, &query)? }))
}

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let class_name = get_class_name(params, "className")?;
    let student = store::insert_student(conn, &name, class_name)?;
    Ok(json!({ "student": student }))
}

/// Accepts either pasted `text` (one name per line) or a `names` array.
fn students_bulk_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_name = get_class_name(params, "className")?;
    let names = bulk_names(params)?;
    let students = store::insert_students_bulk(conn, &names, class_name)?;
    Ok(json!({ "created": students.len(), "students": students }))
}

pub(crate) fn bulk_names(params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    if let Some(text) = params.get("text").and_then(|v| v.as_str()) {
        return Ok(bulk::parse_names(text));
    }
    let Some(list) = params.get("names").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing text"));
    };
    let joined = list
        .iter()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(bulk::parse_names(&joined))
}

fn students_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let removed = store::delete_student(conn, &student_id)?;
    Ok(json!({ "ok": true, "recordsDeleted": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_db(state, req, students_list)),
        "students.search" => Some(with_db(state, req, students_search)),
        "students.create" => Some(with_db(state, req, students_create)),
        "students.bulkCreate" => Some(with_db(state, req, students_bulk_create)),
        "students.delete" => Some(with_db(state, req, students_delete)),
        _ => None,
    }
}
