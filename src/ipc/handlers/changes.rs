use crate::feed::{self, Subscription};
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::with_db;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

const DEFAULT_LIMIT: u64 = 500;

fn changes_since(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let seq = params.get("seq").and_then(|v| v.as_i64()).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, DEFAULT_LIMIT) as usize;
    let missed = feed::missed_since(conn, seq)?;
    let events = feed::changes_since(conn, seq, limit)?;
    let next = events.last().map(|e| e.seq).unwrap_or(seq);
    Ok(json!({ "events": events, "next": next, "missed": missed }))
}

fn table_list(params: &serde_json::Value) -> Option<Vec<String>> {
    params.get("tables").and_then(|v| v.as_array()).map(|list| {
        list.iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect()
    })
}

fn handle_subscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match Subscription::from_now(conn, table_list(&req.params)) {
        Ok(sub) => {
            let cursor = sub.cursor();
            state.subscription = Some(sub);
            ok(&req.id, json!({ "cursor": cursor }))
        }
        Err(e) => HandlerErr::from(e).response(&req.id, &req.method),
    }
}

fn handle_poll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(sub)) = (state.db.as_ref(), state.subscription.as_mut()) else {
        return err(&req.id, "no_subscription", "call changes.subscribe first", None);
    };
    let polled = (|| -> rusqlite::Result<_> {
        let missed = feed::missed_since(conn, sub.cursor())?;
        Ok((missed, sub.poll(conn)?))
    })();
    match polled {
        Ok((missed, events)) => ok(
            &req.id,
            json!({ "events": events, "cursor": sub.cursor(), "missed": missed }),
        ),
        Err(e) => HandlerErr::from(e).response(&req.id, &req.method),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "changes.since" => Some(with_db(state, req, changes_since)),
        "changes.subscribe" => Some(handle_subscribe(state, req)),
        "changes.poll" => Some(handle_poll(state, req)),
        _ => None,
    }
}
