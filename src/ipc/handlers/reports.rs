use crate::aggregate::{self, DateRange, DormitoryFilter};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_class_name, get_required_str, parse_params, with_db};
use crate::ipc::types::{AppState, Request};
use crate::store;
use rusqlite::Connection;
use serde_json::json;

fn reports_student(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let range: DateRange = parse_params(params)?;
    let student = store::get_student(conn, &student_id)?;
    let records = store::list_records_for_student(conn, &student_id)?;
    let report = aggregate::student_report(&student, &records, &range);
    serde_json::to_value(report).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn reports_class(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_name = get_class_name(params, "className")?;
    let range: DateRange = parse_params(params)?;
    let students = store::list_students(conn, Some(class_name))?;
    let records = store::list_records_for_class(conn, class_name)?;
    let rows = aggregate::class_report(&students, &records, class_name, &range);
    Ok(json!({
        "className": class_name,
        "classLabel": class_name.label(),
        "rows": rows
    }))
}

fn reports_dormitory(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let filter: DormitoryFilter = parse_params(params)?;
    let permissions = store::list_dormitory_permissions(conn)?;
    let report = aggregate::dormitory_report(&permissions, &filter);
    serde_json::to_value(report).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.student" => Some(with_db(state, req, reports_student)),
        "reports.class" => Some(with_db(state, req, reports_class)),
        "reports.dormitory" => Some(with_db(state, req, reports_dormitory)),
        _ => None,
    }
}
