use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use crate::session::{self, AuthContext};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if s.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(s)
}

/// Absent, null and blank all read as `None`.
pub fn get_optional_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            Ok((!t.is_empty()).then(|| t.to_string()))
        }
        Some(_) => Err(HandlerErr::bad_params(format!(
            "{} must be string or null",
            key
        ))),
    }
}

pub fn get_str_or_default(params: &Value, key: &str) -> Result<String, HandlerErr> {
    Ok(get_optional_str(params, key)?.unwrap_or_default())
}

/// Accepts JSON numbers and numeric strings, the way form posts arrive.
pub fn get_required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(HandlerErr::bad_params(format!("{} must be a number", key))),
    }
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    let n = match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    n.ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key)))
}

pub fn get_required_bool(params: &Value, key: &str) -> Result<bool, HandlerErr> {
    match params.get(key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(HandlerErr::bad_params(format!("{} must be true or false", key))),
        },
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a boolean", key))),
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

/// `YYYY-MM-DD`, normalized back to the same format.
pub fn get_required_date(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let raw = get_required_str(params, key)?;
    parse_date(&raw, key)
}

pub fn parse_date(raw: &str, key: &str) -> Result<String, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn get_patch(params: &Value) -> Result<&serde_json::Map<String, Value>, HandlerErr> {
    params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))
}

/// Patch semantics for a nullable reference: absent keeps the current value,
/// null (or blank) clears it, a string replaces it.
pub fn patch_optional_ref(
    patch: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Option<String>>, HandlerErr> {
    match patch.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(Some(s.trim().to_string()))),
        Some(_) => Err(HandlerErr::bad_params(format!(
            "patch.{} must be string or null",
            key
        ))),
    }
}

/// Absent keeps the current value. `required` fields may not be blanked.
pub fn patch_str(
    patch: &serde_json::Map<String, Value>,
    key: &str,
    required: bool,
) -> Result<Option<String>, HandlerErr> {
    match patch.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            if required && t.is_empty() {
                return Err(HandlerErr::bad_params(format!(
                    "patch.{} must not be empty",
                    key
                )));
            }
            Ok(Some(t.to_string()))
        }
        Some(Value::Null) if !required => Ok(Some(String::new())),
        Some(_) => Err(HandlerErr::bad_params(format!(
            "patch.{} must be a string",
            key
        ))),
    }
}

pub fn patch_i64(patch: &serde_json::Map<String, Value>, key: &str) -> Result<Option<i64>, HandlerErr> {
    match patch.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("patch.{} must be an integer", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| HandlerErr::bad_params(format!("patch.{} must be an integer", key))),
        Some(_) => Err(HandlerErr::bad_params(format!(
            "patch.{} must be an integer",
            key
        ))),
    }
}

pub fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool, HandlerErr> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found = conn
        .query_row(&sql, [id], |r| r.get::<_, i64>(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn require_exists(
    conn: &Connection,
    table: &str,
    id: &str,
    what: &str,
) -> Result<(), HandlerErr> {
    if exists(conn, table, id)? {
        Ok(())
    } else {
        Err(HandlerErr::not_found(what))
    }
}

pub fn require_optional_exists(
    conn: &Connection,
    table: &str,
    id: Option<&str>,
    what: &str,
) -> Result<(), HandlerErr> {
    match id {
        Some(id) => require_exists(conn, table, id, what),
        None => Ok(()),
    }
}

/// Role record id for the logged-in person; a session whose role row was
/// deleted underneath it reads as not found.
pub fn current_record_id(conn: &Connection, auth: &AuthContext) -> Result<String, HandlerErr> {
    session::role_record_id(conn, &auth.person_id, auth.role)?
        .ok_or_else(|| HandlerErr::not_found(auth.role.label()))
}

fn run(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

/// Unauthenticated call that needs an open workspace.
pub fn with_db<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Connection, &Value) -> Result<Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return HandlerErr::NoWorkspace.response(&req.id);
    };
    run(req, f(conn, &req.params))
}

/// Protected call: resolves the session and checks its role before `f` runs.
pub fn with_role<F>(state: &mut AppState, req: &Request, role: Option<Role>, f: F) -> Value
where
    F: FnOnce(&Connection, &AuthContext, &Value) -> Result<Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return HandlerErr::NoWorkspace.response(&req.id);
    };
    let auth = match session::authorize(conn, req.session.as_deref(), role) {
        Ok(auth) => auth,
        Err(denied) => {
            tracing::debug!(method = %req.method, reason = %denied, "access refused");
            return HandlerErr::from(denied).response(&req.id);
        }
    };
    run(req, f(conn, &auth, &req.params))
}

pub fn with_admin<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Connection, &AuthContext, &Value) -> Result<Value, HandlerErr>,
{
    with_role(state, req, Some(Role::Admin), f)
}

pub fn with_teacher<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Connection, &AuthContext, &Value) -> Result<Value, HandlerErr>,
{
    with_role(state, req, Some(Role::Teacher), f)
}

pub fn with_student<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Connection, &AuthContext, &Value) -> Result<Value, HandlerErr>,
{
    with_role(state, req, Some(Role::Student), f)
}
