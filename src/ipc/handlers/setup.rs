use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::people::{insert_person, NewPerson, NewRoleRecord};
use crate::ipc::helpers::with_db;
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::redirect;
use rusqlite::Connection;
use serde_json::{json, Value};

fn admin_count(conn: &Connection) -> Result<i64, HandlerErr> {
    Ok(conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?)
}

fn setup_status(conn: &Connection) -> Result<Value, HandlerErr> {
    Ok(json!({ "initialized": admin_count(conn)? > 0 }))
}

/// Creates the first administrator of an empty workspace. Once any
/// administrator exists, further people are added through `people.create`.
fn setup_bootstrap(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let person = NewPerson::from_params(params)?;

    let tx = conn.unchecked_transaction()?;
    if admin_count(&tx)? > 0 {
        return Err(HandlerErr::AlreadyInitialized);
    }
    let (person_id, admin_id) = insert_person(&tx, &person, &NewRoleRecord::Admin)?;
    tx.commit()?;

    tracing::info!(person_id = %person_id, "bootstrap administrator created");
    let mut out = redirect("auth.login", "Administrator created.");
    out["personId"] = json!(person_id);
    out["adminId"] = json!(admin_id);
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "setup.status" => Some(with_db(state, req, |conn, _| setup_status(conn))),
        "setup.bootstrap" => Some(with_db(state, req, setup_bootstrap)),
        _ => None,
    }
}
