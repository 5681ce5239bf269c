use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::lookups::{self, PERSON_NAME_SQL};
use crate::ipc::helpers::{
    current_record_id, get_required_bool, get_required_date, get_required_str, require_exists,
    with_teacher,
};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage, SelectOption};
use crate::model::{present_label, Role};
use crate::session::AuthContext;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

/// Rows shown on the attendance list pages.
pub const RECENT_ATTENDANCE_LIMIT: i64 = 50;

fn attendance_list(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let sql = format!(
        "SELECT a.id, {}, s.label, a.date, a.present
         FROM attendance a
         JOIN subjects s ON s.id = a.subject_id
         JOIN students st ON st.id = a.student_id
         JOIN persons p ON p.id = st.person_id
         WHERE a.teacher_id = ?
         ORDER BY a.date DESC, p.last_name, p.first_name
         LIMIT ?",
        PERSON_NAME_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((&teacher_id, RECENT_ATTENDANCE_LIMIT), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, i64>(4)? != 0,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "Attendance",
        &["Student", "Subject", "Date", "Status"],
        Role::Teacher,
    )
    .with_create("attendance.form");
    for (id, student, subject, date, present) in rows {
        list.push(ListItem::new(
            id,
            vec![
                json!(student),
                json!(subject),
                json!(date),
                json!(present_label(present)),
            ],
        ));
    }
    list.render()
}

fn attendance_form(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let presence = [true, false]
        .into_iter()
        .map(|p| SelectOption::new(p.to_string(), present_label(p)));
    FormPage::new(
        "Mark attendance",
        "attendance.mark",
        "attendance.list",
        Role::Teacher,
    )
    .field(FormField::select("studentId", "Student", lookups::students(conn)?))
    .field(FormField::select(
        "subjectId",
        "Subject",
        lookups::subjects_taught_by(conn, &teacher_id)?,
    ))
    .field(FormField::date("date", "Date"))
    .field(FormField::select("present", "Presence", presence))
    .render()
}

/// One mark per (student, subject, date); a repeat mark overwrites the flag
/// and the recording teacher.
fn attendance_mark(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let student_id = get_required_str(params, "studentId")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let date = get_required_date(params, "date")?;
    let present = get_required_bool(params, "present")?;
    require_exists(conn, "students", &student_id, "student")?;
    require_exists(conn, "subjects", &subject_id, "subject")?;

    conn.execute(
        "INSERT INTO attendance(id, student_id, subject_id, date, present, teacher_id)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id, date) DO UPDATE SET
           present = excluded.present,
           teacher_id = excluded.teacher_id",
        (
            Uuid::new_v4().to_string(),
            &student_id,
            &subject_id,
            &date,
            present as i64,
            &teacher_id,
        ),
    )?;
    let attendance_id: String = conn.query_row(
        "SELECT id FROM attendance WHERE student_id = ? AND subject_id = ? AND date = ?",
        (&student_id, &subject_id, &date),
        |r| r.get(0),
    )?;
    tracing::debug!(student_id = %student_id, subject_id = %subject_id, date = %date, present, "attendance marked");

    let mut out = redirect("attendance.list", "Attendance recorded.");
    out["attendanceId"] = json!(attendance_id);
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "attendance.list" => Some(with_teacher(state, req, |conn, auth, _| {
            attendance_list(conn, auth)
        })),
        "attendance.form" => Some(with_teacher(state, req, |conn, auth, _| {
            attendance_form(conn, auth)
        })),
        "attendance.mark" => Some(with_teacher(state, req, attendance_mark)),
        _ => None,
    }
}
