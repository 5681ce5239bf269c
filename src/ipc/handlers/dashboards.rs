use crate::calc;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{current_record_id, with_admin, with_student, with_teacher};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::page;
use crate::model::display_name;
use crate::session::AuthContext;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};

const RECENT_LIMIT: i64 = 5;

fn count(conn: &Connection, sql: &str, key: Option<&str>) -> Result<i64, HandlerErr> {
    let n = match key {
        Some(key) => conn.query_row(sql, [key], |r| r.get(0))?,
        None => conn.query_row(sql, [], |r| r.get(0))?,
    };
    Ok(n)
}

fn person_name(conn: &Connection, person_id: &str) -> Result<String, HandlerErr> {
    let (first, last): (String, String) = conn
        .query_row(
            "SELECT first_name, last_name FROM persons WHERE id = ?",
            [person_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| HandlerErr::not_found("person"))?;
    Ok(display_name(&first, &last))
}

fn admin_dashboard(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    page(
        "admin_dashboard",
        &json!({
            "userName": person_name(conn, &auth.person_id)?,
            "role": auth.role,
            "stats": {
                "colleges": count(conn, "SELECT COUNT(*) FROM colleges", None)?,
                "departments": count(conn, "SELECT COUNT(*) FROM departments", None)?,
                "teachers": count(conn, "SELECT COUNT(*) FROM teachers", None)?,
                "students": count(conn, "SELECT COUNT(*) FROM students", None)?,
            }
        }),
    )
}

fn teacher_dashboard(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let headed: Option<Value> = conn
        .query_row(
            "SELECT id, name, code FROM departments WHERE head_teacher_id = ?",
            [&teacher_id],
            |r| {
                Ok(json!({
                    "id": r.get::<_, String>(0)?,
                    "name": r.get::<_, String>(1)?,
                    "code": r.get::<_, String>(2)?,
                }))
            },
        )
        .optional()?;

    page(
        "teacher_dashboard",
        &json!({
            "userName": person_name(conn, &auth.person_id)?,
            "role": auth.role,
            "teacherId": teacher_id,
            "isHead": headed.is_some(),
            "headedDepartment": headed,
            "stats": {
                "subjects": count(conn, "SELECT COUNT(*) FROM subjects WHERE teacher_id = ?", Some(teacher_id.as_str()))?,
                "content": count(conn, "SELECT COUNT(*) FROM course_contents WHERE teacher_id = ?", Some(teacher_id.as_str()))?,
                "grades": count(
                    conn,
                    "SELECT COUNT(*) FROM grades g JOIN subjects s ON s.id = g.subject_id WHERE s.teacher_id = ?",
                    Some(teacher_id.as_str()),
                )?,
            }
        }),
    )
}

fn recent_grades(conn: &Connection, student_id: &str) -> Result<Vec<Value>, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT s.label, g.value, g.updated_at
         FROM grades g
         JOIN subjects s ON s.id = g.subject_id
         WHERE g.student_id = ?
         ORDER BY g.updated_at DESC, g.rowid DESC
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map((student_id, RECENT_LIMIT), |r| {
            Ok(json!({
                "subject": r.get::<_, String>(0)?,
                "value": r.get::<_, f64>(1)?,
                "updatedAt": r.get::<_, String>(2)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn recent_absences(conn: &Connection, student_id: &str) -> Result<Vec<Value>, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT s.label, a.date
         FROM attendance a
         JOIN subjects s ON s.id = a.subject_id
         WHERE a.student_id = ? AND a.present = 0
         ORDER BY a.date DESC
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map((student_id, RECENT_LIMIT), |r| {
            Ok(json!({
                "subject": r.get::<_, String>(0)?,
                "date": r.get::<_, String>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn student_dashboard(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let student_id = current_record_id(conn, auth)?;
    page(
        "student_dashboard",
        &json!({
            "userName": person_name(conn, &auth.person_id)?,
            "role": auth.role,
            "studentId": student_id,
            "generalAverage": calc::student_general_average(conn, &student_id)?,
            "absenceHours": calc::student_absence_hours(conn, &student_id)?,
            "stats": {
                "subjects": count(conn, "SELECT COUNT(DISTINCT subject_id) FROM grades WHERE student_id = ?", Some(student_id.as_str()))?,
                "grades": count(conn, "SELECT COUNT(*) FROM grades WHERE student_id = ?", Some(student_id.as_str()))?,
            },
            "recentGrades": recent_grades(conn, &student_id)?,
            "recentAbsences": recent_absences(conn, &student_id)?,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "admin.dashboard" => Some(with_admin(state, req, |conn, auth, _| {
            admin_dashboard(conn, auth)
        })),
        "teacher.dashboard" => Some(with_teacher(state, req, |conn, auth, _| {
            teacher_dashboard(conn, auth)
        })),
        "student.dashboard" => Some(with_student(state, req, |conn, auth, _| {
            student_dashboard(conn, auth)
        })),
        _ => None,
    }
}
