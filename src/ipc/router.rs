use serde_json::json;
use tracing::{debug, warn};

use super::handlers;
use super::types::{AppState, Request};
use crate::access::{self, Decision};
use crate::auth;
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "dispatch");

    if let Some(resp) = gate(state, &req) {
        return resp;
    }

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::profiles::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::courses::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::records::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::dormitory::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::changes::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// Applies the role gate for the method's area. `None` lets the request through.
fn gate(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    let area = access::area_for_method(&req.method);
    let allowed = area.allowed_roles()?;

    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let caller = match auth::caller_for(conn, state.session.as_ref()) {
        Ok(c) => c,
        Err(e) => return Some(err(&req.id, "db_query_failed", e.to_string(), None)),
    };

    let decision = access::decide(caller, allowed);
    let redirect = decision.redirect_path()?;
    warn!(method = %req.method, ?area, ?decision, "access denied");
    let (code, message) = match decision {
        Decision::RedirectToLogin => ("unauthenticated", "sign in first"),
        _ => ("forbidden", "your role cannot use this area"),
    };
    Some(err(
        &req.id,
        code,
        message,
        Some(json!({ "redirect": redirect, "area": area })),
    ))
}
