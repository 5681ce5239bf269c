use crate::calc;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{current_record_id, get_required_str, with_teacher};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::page;
use crate::model::Role;
use crate::session::AuthContext;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};

/// Only the department's head sees its statistics; anyone else gets not_found.
fn departments_stats(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = current_record_id(conn, auth)?;
    let department_id = get_required_str(params, "departmentId")?;

    let (name, code, college): (String, String, String) = conn
        .query_row(
            "SELECT d.name, d.code, c.name
             FROM departments d
             JOIN colleges c ON c.id = d.college_id
             WHERE d.id = ? AND d.head_teacher_id = ?",
            (&department_id, &teacher_id),
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| HandlerErr::not_found("department"))?;

    let teacher_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM teachers WHERE department_id = ?",
        [&department_id],
        |r| r.get(0),
    )?;
    let subjects = calc::department_subject_averages(conn, &department_id)?;

    page(
        "department_stats",
        &json!({
            "department": {
                "id": department_id,
                "name": name,
                "code": code,
                "college": college,
            },
            "average": calc::department_average(conn, &department_id)?,
            "teacherCount": teacher_count,
            "subjectCount": subjects.len(),
            "subjects": subjects,
            "role": Role::Teacher,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "departments.stats" => Some(with_teacher(state, req, departments_stats)),
        _ => None,
    }
}
