use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::lookups;
use crate::ipc::helpers::{
    current_record_id, get_patch, get_required_str, patch_str, require_exists, with_teacher,
};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage, SelectOption};
use crate::model::{ContentKind, Role};
use crate::session::AuthContext;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use uuid::Uuid;

fn parse_kind(raw: &str) -> Result<ContentKind, HandlerErr> {
    ContentKind::parse(raw).ok_or_else(|| HandlerErr::bad_params("kind must be lesson or exercise"))
}

fn kind_options() -> Vec<SelectOption> {
    [ContentKind::Lesson, ContentKind::Exercise]
        .into_iter()
        .map(|k| SelectOption::new(k.as_str(), k.label()))
        .collect()
}

/// `created_at` keeps only the calendar day for list display.
fn day_of(timestamp: &str) -> String {
    timestamp.get(..10).unwrap_or(timestamp).to_string()
}

fn content_list(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.title, c.kind, s.label, c.created_at
         FROM course_contents c
         JOIN subjects s ON s.id = c.subject_id
         WHERE c.teacher_id = ?
         ORDER BY c.created_at DESC, c.title",
    )?;
    let rows = stmt
        .query_map([&teacher_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "My lessons and exercises",
        &["Title", "Kind", "Subject", "Created"],
        Role::Teacher,
    )
    .with_create("content.form");
    for (id, title, kind, subject, created_at) in rows {
        let kind = ContentKind::parse(&kind).map(|k| k.label()).unwrap_or("?");
        list.push(
            ListItem::new(
                id,
                vec![json!(title), json!(kind), json!(subject), json!(day_of(&created_at))],
            )
            .editable("content.update")
            .deletable("content.delete"),
        );
    }
    list.render()
}

fn content_form(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    FormPage::new(
        "Add a lesson or exercise",
        "content.create",
        "content.list",
        Role::Teacher,
    )
    .field(FormField::text("title", "Title"))
    .field(FormField::select("kind", "Kind", kind_options()))
    .field(FormField::select(
        "subjectId",
        "Subject",
        lookups::subjects_taught_by(conn, &teacher_id)?,
    ))
    .field(FormField::textarea("body", "Content"))
    .render()
}

fn content_create(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let title = get_required_str(params, "title")?;
    let kind = parse_kind(&get_required_str(params, "kind")?)?;
    let body = get_required_str(params, "body")?;
    let subject_id = get_required_str(params, "subjectId")?;
    require_exists(conn, "subjects", &subject_id, "subject")?;

    let content_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO course_contents(id, title, kind, body, subject_id, teacher_id, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &content_id,
            &title,
            kind.as_str(),
            &body,
            &subject_id,
            &teacher_id,
            &now,
            &now,
        ),
    )?;
    tracing::info!(content_id = %content_id, kind = kind.as_str(), "course content created");
    let mut out = redirect("content.list", format!("{} created.", kind.label()));
    out["contentId"] = json!(content_id);
    Ok(out)
}

fn content_update(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let content_id = get_required_str(params, "contentId")?;
    let patch = get_patch(params)?;

    // Someone else's content reads as missing.
    let (mut title, mut kind, mut body, mut subject_id): (String, String, String, String) = conn
        .query_row(
            "SELECT title, kind, body, subject_id FROM course_contents
             WHERE id = ? AND teacher_id = ?",
            (&content_id, &teacher_id),
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?
        .ok_or_else(|| HandlerErr::not_found("content"))?;

    if let Some(v) = patch_str(patch, "title", true)? {
        title = v;
    }
    if let Some(v) = patch_str(patch, "kind", true)? {
        kind = parse_kind(&v)?.as_str().to_string();
    }
    if let Some(v) = patch_str(patch, "body", true)? {
        body = v;
    }
    if let Some(v) = patch_str(patch, "subjectId", true)? {
        require_exists(conn, "subjects", &v, "subject")?;
        subject_id = v;
    }

    conn.execute(
        "UPDATE course_contents
         SET title = ?, kind = ?, body = ?, subject_id = ?, updated_at = ?
         WHERE id = ?",
        (
            &title,
            &kind,
            &body,
            &subject_id,
            Utc::now().to_rfc3339(),
            &content_id,
        ),
    )?;
    Ok(redirect("content.list", "Content updated."))
}

fn content_delete(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let content_id = get_required_str(params, "contentId")?;
    let n = conn.execute(
        "DELETE FROM course_contents WHERE id = ? AND teacher_id = ?",
        (&content_id, &teacher_id),
    )?;
    if n == 0 {
        return Err(HandlerErr::not_found("content"));
    }
    tracing::info!(content_id = %content_id, "course content deleted");
    Ok(redirect("content.list", "Content deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "content.list" => Some(with_teacher(state, req, |conn, auth, _| content_list(conn, auth))),
        "content.form" => Some(with_teacher(state, req, |conn, auth, _| content_form(conn, auth))),
        "content.create" => Some(with_teacher(state, req, content_create)),
        "content.update" => Some(with_teacher(state, req, content_update)),
        "content.delete" => Some(with_teacher(state, req, content_delete)),
        _ => None,
    }
}
