use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::lookups::{self, PERSON_NAME_SQL};
use crate::ipc::helpers::{
    current_record_id, get_required_f64, get_required_str, require_exists, with_teacher,
};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage};
use crate::model::Role;
use crate::session::AuthContext;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

/// Grades are marks out of twenty.
pub const GRADE_MAX: f64 = 20.0;

fn grades_list(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let sql = format!(
        "SELECT g.id, {}, s.label, g.value
         FROM grades g
         JOIN subjects s ON s.id = g.subject_id
         JOIN students st ON st.id = g.student_id
         JOIN persons p ON p.id = st.person_id
         WHERE s.teacher_id = ?
         ORDER BY s.label, p.last_name, p.first_name",
        PERSON_NAME_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([&teacher_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, f64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new("Grades", &["Student", "Subject", "Grade"], Role::Teacher)
        .with_create("grades.form");
    for (id, student, subject, value) in rows {
        list.push(ListItem::new(id, vec![json!(student), json!(subject), json!(value)]));
    }
    list.render()
}

fn grades_form(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    FormPage::new("Assign a grade", "grades.assign", "grades.list", Role::Teacher)
        .field(FormField::select("studentId", "Student", lookups::students(conn)?))
        .field(FormField::select(
            "subjectId",
            "Subject",
            lookups::subjects_taught_by(conn, &teacher_id)?,
        ))
        .field(FormField::number("value", "Grade (out of 20)"))
        .render()
}

/// One grade per (student, subject); a repeat assignment overwrites the value.
fn grades_assign(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let student_id = get_required_str(params, "studentId")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let value = get_required_f64(params, "value")?;
    if !(0.0..=GRADE_MAX).contains(&value) {
        return Err(HandlerErr::bad_params(format!(
            "value must be between 0 and {}",
            GRADE_MAX
        )));
    }
    require_exists(conn, "students", &student_id, "student")?;
    require_exists(conn, "subjects", &subject_id, "subject")?;

    conn.execute(
        "INSERT INTO grades(id, student_id, subject_id, value, updated_at)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        (
            Uuid::new_v4().to_string(),
            &student_id,
            &subject_id,
            value,
            Utc::now().to_rfc3339(),
        ),
    )?;
    let grade_id: String = conn.query_row(
        "SELECT id FROM grades WHERE student_id = ? AND subject_id = ?",
        (&student_id, &subject_id),
        |r| r.get(0),
    )?;
    tracing::debug!(
        teacher_id = %teacher_id,
        student_id = %student_id,
        subject_id = %subject_id,
        value,
        "grade assigned"
    );

    let mut out = redirect("grades.list", "Grade assigned.");
    out["gradeId"] = json!(grade_id);
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "grades.list" => Some(with_teacher(state, req, |conn, auth, _| grades_list(conn, auth))),
        "grades.form" => Some(with_teacher(state, req, |conn, auth, _| grades_form(conn, auth))),
        "grades.assign" => Some(with_teacher(state, req, grades_assign)),
        _ => None,
    }
}
