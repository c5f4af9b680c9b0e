use crate::auth;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, with_db};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use rusqlite::Connection;
use serde_json::json;

fn required_role(params: &serde_json::Value) -> Result<Role, HandlerErr> {
    let raw = get_required_str(params, "role")?;
    Role::parse(&raw).ok_or_else(|| HandlerErr::bad_params(format!("unknown role: {}", raw)))
}

fn profiles_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "profiles": auth::list_profiles(conn)? }))
}

fn profiles_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let password = get_required_str(params, "password")?;
    let role = required_role(params)?;
    let profile = auth::create_account(conn, &email, &password, role)?;
    Ok(json!({ "profile": profile }))
}

fn profiles_set_role(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let profile_id = get_required_str(params, "profileId")?;
    let role = required_role(params)?;
    let profile = auth::set_role(conn, &profile_id, role)?;
    Ok(json!({ "profile": profile }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "profiles.list" => Some(with_db(state, req, profiles_list)),
        "profiles.create" => Some(with_db(state, req, profiles_create)),
        "profiles.setRole" => Some(with_db(state, req, profiles_set_role)),
        _ => None,
    }
}
