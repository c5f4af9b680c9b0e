use crate::aggregate::{self, RecordFilter};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_class_name, get_optional_str, get_required_str, parse_params, with_db};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::store::{self, AttendanceEntry};
use rusqlite::Connection;
use serde_json::json;

fn parse_status(raw: &str) -> Result<AttendanceStatus, HandlerErr> {
    AttendanceStatus::parse(raw).ok_or_else(|| HandlerErr::bad_params(format!("unknown status: {}", raw)))
}

fn attendance_submit(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_name = get_class_name(params, "className")?;
    let course = get_required_str(params, "course")?;
    let date = get_optional_str(params, "date").unwrap_or_default();
    let Some(entries_json) = params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing entries"));
    };
    let mut entries = Vec::with_capacity(entries_json.len());
    for e in entries_json {
        entries.push(AttendanceEntry {
            student_id: get_required_str(e, "studentId")?,
            status: parse_status(&get_required_str(e, "status")?)?,
        });
    }
    let records = store::insert_attendance_records(conn, class_name, &course, &date, &entries)?;
    Ok(json!({ "created": records.len(), "records": records }))
}

fn permissions_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_optional_str(params, "date").unwrap_or_default();
    let status = parse_status(&get_required_str(params, "status")?)?;
    let record = store::insert_permission_record(conn, &student_id, &date, status)?;
    Ok(json!({ "record": record }))
}

/// The general report: all records narrowed by the optional filters.
fn records_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let filter: RecordFilter = parse_params(params)?;
    let all = store::list_records(conn)?;
    let records = aggregate::filter_records(&all, &filter);
    Ok(json!({
        "records": records,
        "summary": aggregate::summarize(&records)
    }))
}

fn records_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let record_id = get_required_str(params, "recordId")?;
    store::delete_record(conn, &record_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.submit" => Some(with_db(state, req, attendance_submit)),
        "permissions.create" => Some(with_db(state, req, permissions_create)),
        "records.list" => Some(with_db(state, req, records_list)),
        "records.delete" => Some(with_db(state, req, records_delete)),
        _ => None,
    }
}
