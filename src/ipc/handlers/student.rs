//! Read-only pages for the logged-in student.
//!
//! A student "takes" a subject once they hold a grade in it; content and
//! schedule pages are scoped to those subjects.

use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::attendance::RECENT_ATTENDANCE_LIMIT;
use crate::ipc::handlers::lookups::PERSON_NAME_SQL;
use crate::ipc::helpers::{current_record_id, get_required_str, with_student};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{page, ListItem, ListPage};
use crate::model::{present_label, ContentKind, Role, NOT_AVAILABLE};
use crate::session::AuthContext;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};

const TAKEN_SUBJECTS_SQL: &str = "SELECT subject_id FROM grades WHERE student_id = ?";

fn or_na(v: Option<String>) -> String {
    v.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn student_grades(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let student_id = current_record_id(conn, auth)?;
    let sql = format!(
        "SELECT g.id, s.label, g.value, {}
         FROM grades g
         JOIN subjects s ON s.id = g.subject_id
         LEFT JOIN teachers t ON t.id = s.teacher_id
         LEFT JOIN persons p ON p.id = t.person_id
         WHERE g.student_id = ?
         ORDER BY s.label",
        PERSON_NAME_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([&student_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, f64>(2)?,
                r.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new("My grades", &["Subject", "Grade", "Teacher"], Role::Student);
    for (id, subject, value, teacher) in rows {
        list.push(ListItem::new(id, vec![json!(subject), json!(value), json!(or_na(teacher))]));
    }
    list.render()
}

fn student_attendance(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let student_id = current_record_id(conn, auth)?;
    let mut stmt = conn.prepare(
        "SELECT a.id, s.label, a.date, a.present
         FROM attendance a
         JOIN subjects s ON s.id = a.subject_id
         WHERE a.student_id = ?
         ORDER BY a.date DESC, s.label
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map((&student_id, RECENT_ATTENDANCE_LIMIT), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, i64>(3)? != 0,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new("My attendance", &["Subject", "Date", "Status"], Role::Student);
    for (id, subject, date, present) in rows {
        list.push(ListItem::new(
            id,
            vec![json!(subject), json!(date), json!(present_label(present))],
        ));
    }
    list.render()
}

fn student_content(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let student_id = current_record_id(conn, auth)?;
    let sql = format!(
        "SELECT c.id, c.title, c.kind, s.label, c.created_at
         FROM course_contents c
         JOIN subjects s ON s.id = c.subject_id
         WHERE c.subject_id IN ({})
         ORDER BY s.label, c.created_at DESC",
        TAKEN_SUBJECTS_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([&student_id], |r| {
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
        "Lessons and exercises",
        &["Title", "Kind", "Subject", "Date"],
        Role::Student,
    );
    for (id, title, kind, subject, created_at) in rows {
        let kind = ContentKind::parse(&kind).map(|k| k.label()).unwrap_or("?");
        let day = created_at.get(..10).unwrap_or(&created_at).to_string();
        list.push(ListItem::new(
            id,
            vec![json!(title), json!(kind), json!(subject), json!(day)],
        ));
    }
    list.render()
}

/// Full body of one lesson or exercise from a taken subject.
fn student_content_view(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = current_record_id(conn, auth)?;
    let content_id = get_required_str(params, "contentId")?;
    let sql = format!(
        "SELECT c.title, c.kind, c.body, s.label, {}, c.created_at, c.updated_at
         FROM course_contents c
         JOIN subjects s ON s.id = c.subject_id
         JOIN teachers t ON t.id = c.teacher_id
         JOIN persons p ON p.id = t.person_id
         WHERE c.id = ? AND c.subject_id IN ({})",
        PERSON_NAME_SQL, TAKEN_SUBJECTS_SQL
    );
    let content = conn
        .query_row(&sql, (&content_id, &student_id), |r| {
            let kind: String = r.get(1)?;
            Ok(json!({
                "id": content_id,
                "title": r.get::<_, String>(0)?,
                "kind": kind,
                "kindLabel": ContentKind::parse(&kind).map(|k| k.label()),
                "body": r.get::<_, String>(2)?,
                "subject": r.get::<_, String>(3)?,
                "author": r.get::<_, String>(4)?,
                "createdAt": r.get::<_, String>(5)?,
                "updatedAt": r.get::<_, String>(6)?,
            }))
        })
        .optional()?
        .ok_or_else(|| HandlerErr::not_found("content"))?;

    page(
        "content_detail",
        &json!({
            "content": content,
            "backMethod": "student.content",
            "role": Role::Student,
        }),
    )
}

fn student_schedule(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let student_id = current_record_id(conn, auth)?;
    let sql = format!(
        "SELECT s.id, s.label, {}, 'Room ' || c.number
         FROM subjects s
         LEFT JOIN teachers t ON t.id = s.teacher_id
         LEFT JOIN persons p ON p.id = t.person_id
         LEFT JOIN classrooms c ON c.id = s.classroom_id
         WHERE s.id IN ({})
         ORDER BY s.label",
        PERSON_NAME_SQL, TAKEN_SUBJECTS_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([&student_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new("My timetable", &["Subject", "Teacher", "Classroom"], Role::Student);
    for (id, subject, teacher, room) in rows {
        list.push(ListItem::new(
            id,
            vec![json!(subject), json!(or_na(teacher)), json!(or_na(room))],
        ));
    }
    list.render()
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "student.grades" => Some(with_student(state, req, |conn, auth, _| student_grades(conn, auth))),
        "student.attendance" => Some(with_student(state, req, |conn, auth, _| {
            student_attendance(conn, auth)
        })),
        "student.content" => Some(with_student(state, req, |conn, auth, _| student_content(conn, auth))),
        "student.content.view" => Some(with_student(state, req, student_content_view)),
        "student.schedule" => Some(with_student(state, req, |conn, auth, _| {
            student_schedule(conn, auth)
        })),
        _ => None,
    }
}
