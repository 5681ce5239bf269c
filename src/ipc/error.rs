use crate::session::{AccessDenied, LoginError};
use rusqlite::ErrorCode;
use serde_json::json;
use thiserror::Error;

/// Method the client should open after a `login_required` failure.
pub const LOGIN_METHOD: &str = "auth.login";

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

/// Reply for a line that could not be decoded; there is no id to echo.
pub fn bad_json(e: &serde_json::Error) -> serde_json::Value {
    json!({
        "ok": false,
        "error": {
            "code": "bad_json",
            "message": e.to_string(),
        }
    })
}

#[derive(Debug, Error)]
pub enum HandlerErr {
    #[error("select a workspace first")]
    NoWorkspace,
    #[error("{0}")]
    BadParams(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    LoginRequired { message: String },
    #[error("invalid identifier")]
    InvalidIdentifier,
    #[error("incorrect user type for this account")]
    RoleMismatch,
    #[error("an administrator already exists")]
    AlreadyInitialized,
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Db(rusqlite::Error),
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::BadParams(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        HandlerErr::NotFound(format!("{what} not found"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            HandlerErr::NoWorkspace => "no_workspace",
            HandlerErr::BadParams(_) => "bad_params",
            HandlerErr::NotFound(_) => "not_found",
            HandlerErr::Conflict(_) => "conflict",
            HandlerErr::LoginRequired { .. } => "login_required",
            HandlerErr::InvalidIdentifier => "invalid_identifier",
            HandlerErr::RoleMismatch => "role_mismatch",
            HandlerErr::AlreadyInitialized => "already_initialized",
            HandlerErr::Encode(_) => "encode_failed",
            HandlerErr::Db(_) => "db_error",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            HandlerErr::LoginRequired { .. } => Some(json!({ "redirect": LOGIN_METHOD })),
            _ => None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        if matches!(self, HandlerErr::Db(_) | HandlerErr::Encode(_)) {
            tracing::warn!(request_id = id, error = %self, "request failed");
        }
        let details = self.details();
        err(id, self.code(), self.to_string(), details)
    }
}

impl From<rusqlite::Error> for HandlerErr {
    fn from(e: rusqlite::Error) -> Self {
        // Uniqueness and foreign-key failures are caller mistakes, not store faults.
        match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => HandlerErr::Conflict(e.to_string()),
            _ => HandlerErr::Db(e),
        }
    }
}

impl From<AccessDenied> for HandlerErr {
    fn from(e: AccessDenied) -> Self {
        match e {
            AccessDenied::Db(e) => e.into(),
            other => HandlerErr::LoginRequired {
                message: other.to_string(),
            },
        }
    }
}

impl From<LoginError> for HandlerErr {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::UnknownIdentifier => HandlerErr::InvalidIdentifier,
            LoginError::RoleMismatch => HandlerErr::RoleMismatch,
            LoginError::Db(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn access_denied_maps_to_login_required_with_redirect() {
        let resp = HandlerErr::from(AccessDenied::WrongRole {
            required: Role::Admin,
            actual: Role::Student,
        })
        .response("7");
        assert_eq!(resp["id"], "7");
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"]["code"], "login_required");
        assert_eq!(resp["error"]["message"], "access not authorized");
        assert_eq!(resp["error"]["details"]["redirect"], LOGIN_METHOD);

        let resp = HandlerErr::from(AccessDenied::NotAuthenticated).response("8");
        assert_eq!(resp["error"]["code"], "login_required");
        assert_eq!(resp["error"]["message"], "login required");
    }

    #[test]
    fn constraint_violation_maps_to_conflict() {
        let conn = rusqlite::Connection::open_in_memory().expect("open");
        conn.execute("CREATE TABLE t(name TEXT UNIQUE)", [])
            .expect("create");
        conn.execute("INSERT INTO t(name) VALUES('a')", [])
            .expect("insert");
        let e = conn
            .execute("INSERT INTO t(name) VALUES('a')", [])
            .expect_err("duplicate");
        assert_eq!(HandlerErr::from(e).code(), "conflict");
    }

    #[test]
    fn login_errors_keep_distinct_codes() {
        assert_eq!(
            HandlerErr::from(LoginError::UnknownIdentifier).code(),
            "invalid_identifier"
        );
        assert_eq!(
            HandlerErr::from(LoginError::RoleMismatch).code(),
            "role_mismatch"
        );
    }
}
