use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, with_admin};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage};
use crate::model::Role;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

fn academies_list(conn: &Connection) -> Result<Value, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, (SELECT COUNT(*) FROM colleges c WHERE c.academy_id = a.id)
         FROM academies a
         ORDER BY a.name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list =
        ListPage::new("Academies", &["Name", "Colleges"], Role::Admin).with_create("academies.form");
    for (id, name, colleges) in rows {
        list.push(ListItem::new(id, vec![json!(name), json!(colleges)]).deletable("academies.delete"));
    }
    list.render()
}

fn academies_form() -> Result<Value, HandlerErr> {
    FormPage::new(
        "Create an academy",
        "academies.create",
        "academies.list",
        Role::Admin,
    )
    .field(FormField::text("name", "Academy name"))
    .render()
}

fn academies_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let academy_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO academies(id, name) VALUES(?, ?)",
        (&academy_id, &name),
    )?;
    tracing::info!(academy_id = %academy_id, "academy created");
    let mut out = redirect("academies.list", "Academy created.");
    out["academyId"] = json!(academy_id);
    Ok(out)
}

/// Cascades to the academy's colleges and everything below them.
fn academies_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let academy_id = get_required_str(params, "academyId")?;
    let n = conn.execute("DELETE FROM academies WHERE id = ?", [&academy_id])?;
    if n == 0 {
        return Err(HandlerErr::not_found("academy"));
    }
    tracing::info!(academy_id = %academy_id, "academy deleted");
    Ok(redirect("academies.list", "Academy deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "academies.list" => Some(with_admin(state, req, |conn, _, _| academies_list(conn))),
        "academies.form" => Some(with_admin(state, req, |_, _, _| academies_form())),
        "academies.create" => Some(with_admin(state, req, |conn, _, p| academies_create(conn, p))),
        "academies.delete" => Some(with_admin(state, req, |conn, _, p| academies_delete(conn, p))),
        _ => None,
    }
}
