use crate::access::{self, Caller};
use crate::auth;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn session_view(
    conn: &rusqlite::Connection,
    session: Option<&auth::Session>,
) -> Result<serde_json::Value, HandlerErr> {
    let Some(session) = session else {
        return Ok(json!({ "session": null, "profile": null }));
    };
    let profile = auth::get_profile(conn, &session.profile_id)?;
    Ok(json!({ "session": session, "profile": profile }))
}

fn handle_sign_up(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let result = (|| -> Result<_, HandlerErr> {
        let email = get_required_str(&req.params, "email")?;
        let password = get_required_str(&req.params, "password")?;
        let profile = auth::sign_up_first_admin(conn, &email, &password)?;
        Ok(json!({ "profile": profile }))
    })();
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id, &req.method),
    }
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let result = (|| -> Result<_, HandlerErr> {
        let email = get_required_str(&req.params, "email")?;
        let password = get_required_str(&req.params, "password")?;
        let session = auth::sign_in(conn, &email, &password)?;
        let view = session_view(conn, Some(&session))?;
        Ok((session, view))
    })();
    match result {
        Ok((session, view)) => {
            state.session = Some(session);
            ok(&req.id, view)
        }
        Err(e) => e.response(&req.id, &req.method),
    }
}

fn handle_resume(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let result = (|| -> Result<_, HandlerErr> {
        let token = get_required_str(&req.params, "token")?;
        let Some(session) = auth::resume(conn, &token)? else {
            return Err(HandlerErr::new("unauthenticated", "session expired or unknown")
                .with_details(json!({ "redirect": "/login" })));
        };
        let view = session_view(conn, Some(&session))?;
        Ok((session, view))
    })();
    match result {
        Ok((session, view)) => {
            state.session = Some(session);
            ok(&req.id, view)
        }
        Err(e) => e.response(&req.id, &req.method),
    }
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.take() else {
        return ok(&req.id, json!({ "signedOut": false }));
    };
    state.subscription = None;
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = auth::sign_out(conn, &session.token) {
            return HandlerErr::from(e).response(&req.id, &req.method);
        }
    }
    info!(profile_id = %session.profile_id, "signed out");
    ok(&req.id, json!({ "signedOut": true }))
}

/// Re-reads the held session, so a sign-out or expiry elsewhere shows here too.
fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "session": null, "profile": null }));
    };
    let result = (|| -> Result<_, HandlerErr> {
        let live = match state.session.as_ref() {
            Some(held) => auth::resume(conn, &held.token)?,
            None => None,
        };
        let view = session_view(conn, live.as_ref())?;
        Ok((live, view))
    })();
    match result {
        Ok((live, view)) => {
            if live.is_none() && state.session.take().is_some() {
                state.subscription = None;
            }
            ok(&req.id, view)
        }
        Err(e) => e.response(&req.id, &req.method),
    }
}

fn current_caller(state: &AppState) -> Result<Caller, HandlerErr> {
    match state.db.as_ref() {
        Some(conn) => Ok(auth::caller_for(conn, state.session.as_ref())?),
        None => Ok(Caller::Anonymous),
    }
}

fn handle_access_check(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = (|| -> Result<_, HandlerErr> {
        let path = get_required_str(&req.params, "path")?;
        let area = access::area_for_path(&path);
        let decision = access::check_area(current_caller(state)?, area);
        Ok(json!({
            "path": path,
            "area": area,
            "decision": decision,
            "redirect": decision.redirect_path()
        }))
    })();
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id, &req.method),
    }
}

fn handle_access_landing(state: &mut AppState, req: &Request) -> serde_json::Value {
    match current_caller(state) {
        Ok(caller) => ok(
            &req.id,
            json!({
                "signedIn": caller != Caller::Anonymous,
                "modules": access::landing_modules(caller)
            }),
        ),
        Err(e) => e.response(&req.id, &req.method),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signUp" => Some(handle_sign_up(state, req)),
        "auth.signIn" => Some(handle_sign_in(state, req)),
        "auth.resume" => Some(handle_resume(state, req)),
        "auth.signOut" => Some(handle_sign_out(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "access.check" => Some(handle_access_check(state, req)),
        "access.landing" => Some(handle_access_landing(state, req)),
        _ => None,
    }
}
