use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_patch, get_required_i64, get_required_str, patch_i64, patch_str, with_admin};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage};
use crate::model::Role;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use uuid::Uuid;

fn check_capacity(capacity: i64) -> Result<i64, HandlerErr> {
    if capacity < 0 {
        return Err(HandlerErr::bad_params("capacity must not be negative"));
    }
    Ok(capacity)
}

fn classrooms_list(conn: &Connection) -> Result<Value, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.number, c.capacity,
                (SELECT COUNT(*) FROM subjects s WHERE s.classroom_id = c.id)
         FROM classrooms c
         ORDER BY c.number",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "Classrooms",
        &["Number", "Capacity", "Subjects"],
        Role::Admin,
    )
    .with_create("classrooms.form");
    for (id, number, capacity, subjects) in rows {
        list.push(
            ListItem::new(id, vec![json!(number), json!(capacity), json!(subjects)])
                .editable("classrooms.update")
                .deletable("classrooms.delete"),
        );
    }
    list.render()
}

fn classrooms_form() -> Result<Value, HandlerErr> {
    FormPage::new(
        "Create a classroom",
        "classrooms.create",
        "classrooms.list",
        Role::Admin,
    )
    .field(FormField::text("number", "Room number"))
    .field(FormField::number("capacity", "Capacity"))
    .render()
}

fn classrooms_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let number = get_required_str(params, "number")?;
    let capacity = check_capacity(get_required_i64(params, "capacity")?)?;
    let classroom_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classrooms(id, number, capacity) VALUES(?, ?, ?)",
        (&classroom_id, &number, capacity),
    )?;
    tracing::info!(classroom_id = %classroom_id, number = %number, "classroom created");
    let mut out = redirect("classrooms.list", "Classroom created.");
    out["classroomId"] = json!(classroom_id);
    Ok(out)
}

fn classrooms_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let classroom_id = get_required_str(params, "classroomId")?;
    let patch = get_patch(params)?;
    let (mut number, mut capacity): (String, i64) = conn
        .query_row(
            "SELECT number, capacity FROM classrooms WHERE id = ?",
            [&classroom_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| HandlerErr::not_found("classroom"))?;

    if let Some(v) = patch_str(patch, "number", true)? {
        number = v;
    }
    if let Some(v) = patch_i64(patch, "capacity")? {
        capacity = check_capacity(v)?;
    }
    conn.execute(
        "UPDATE classrooms SET number = ?, capacity = ? WHERE id = ?",
        (&number, capacity, &classroom_id),
    )?;
    Ok(redirect("classrooms.list", "Classroom updated."))
}

/// Subjects held in the room keep existing with no classroom.
fn classrooms_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let classroom_id = get_required_str(params, "classroomId")?;
    let n = conn.execute("DELETE FROM classrooms WHERE id = ?", [&classroom_id])?;
    if n == 0 {
        return Err(HandlerErr::not_found("classroom"));
    }
    tracing::info!(classroom_id = %classroom_id, "classroom deleted");
    Ok(redirect("classrooms.list", "Classroom deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "classrooms.list" => Some(with_admin(state, req, |conn, _, _| classrooms_list(conn))),
        "classrooms.form" => Some(with_admin(state, req, |_, _, _| classrooms_form())),
        "classrooms.create" => Some(with_admin(state, req, |conn, _, p| {
            classrooms_create(conn, p)
        })),
        "classrooms.update" => Some(with_admin(state, req, |conn, _, p| {
            classrooms_update(conn, p)
        })),
        "classrooms.delete" => Some(with_admin(state, req, |conn, _, p| {
            classrooms_delete(conn, p)
        })),
        _ => None,
    }
}
