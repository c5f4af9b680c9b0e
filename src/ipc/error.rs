use serde_json::json;
use tracing::warn;

use crate::auth::AuthError;
use crate::store::StoreError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str, method: &str) -> serde_json::Value {
        warn!(%method, code = self.code, message = %self.message, "request failed");
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        match e {
            StoreError::NotFound(_) => HandlerErr::new("not_found", message),
            StoreError::Invalid(_) => HandlerErr::bad_params(message),
            StoreError::Insert { table, .. } => HandlerErr::new("db_insert_failed", message)
                .with_details(json!({ "table": table })),
            StoreError::Delete { table, .. } => HandlerErr::new("db_delete_failed", message)
                .with_details(json!({ "table": table })),
            StoreError::Tx(_) => HandlerErr::new("db_tx_failed", message),
            StoreError::Commit(_) => HandlerErr::new("db_commit_failed", message),
            StoreError::Query(_) => HandlerErr::new("db_query_failed", message),
        }
    }
}

impl From<AuthError> for HandlerErr {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::InvalidCredentials => HandlerErr::new("invalid_credentials", message),
            AuthError::EmailTaken(_) => HandlerErr::new("conflict", message),
            AuthError::Invalid(_) => HandlerErr::bad_params(message),
            AuthError::ProfileNotFound => HandlerErr::new("not_found", message),
            AuthError::SignUpClosed => HandlerErr::new("forbidden", message),
            AuthError::Hash(_) => HandlerErr::new("internal", message),
            AuthError::Db(_) => HandlerErr::new("db_query_failed", message),
        }
    }
}

impl From<rusqlite::Error> for HandlerErr {
    fn from(e: rusqlite::Error) -> Self {
        HandlerErr::new("db_query_failed", e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_codes() {
        let e: HandlerErr = StoreError::NotFound("student").into();
        assert_eq!(e.code, "not_found");
        assert_eq!(e.message, "student not found");

        let e: HandlerErr = StoreError::Delete {
            table: "records",
            source: rusqlite::Error::QueryReturnedNoRows,
        }
        .into();
        assert_eq!(e.code, "db_delete_failed");
        assert_eq!(e.details, Some(json!({ "table": "records" })));
    }

    #[test]
    fn envelope_shape() {
        let v = err("7", "bad_params", "missing name", None);
        assert_eq!(v["ok"], json!(false));
        assert_eq!(v["error"]["code"], json!("bad_params"));
        assert!(v["error"].get("details").is_none());
        assert_eq!(ok("8", json!({}))["ok"], json!(true));
    }
}
