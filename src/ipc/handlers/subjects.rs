use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::lookups::{self, PERSON_NAME_SQL};
use crate::ipc::helpers::{
    get_optional_str, get_patch, get_required_str, patch_optional_ref, patch_str,
    require_exists, require_optional_exists, with_admin,
};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage};
use crate::model::{Role, UNASSIGNED};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use uuid::Uuid;

struct SubjectRow {
    label: String,
    department_id: String,
    teacher_id: Option<String>,
    classroom_id: Option<String>,
}

fn load_subject(conn: &Connection, subject_id: &str) -> Result<SubjectRow, HandlerErr> {
    conn.query_row(
        "SELECT label, department_id, teacher_id, classroom_id FROM subjects WHERE id = ?",
        [subject_id],
        |r| {
            Ok(SubjectRow {
                label: r.get(0)?,
                department_id: r.get(1)?,
                teacher_id: r.get(2)?,
                classroom_id: r.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| HandlerErr::not_found("subject"))
}

fn subjects_list(conn: &Connection) -> Result<Value, HandlerErr> {
    let sql = format!(
        "SELECT s.id, s.label, d.name, {}, c.number
         FROM subjects s
         JOIN departments d ON d.id = s.department_id
         LEFT JOIN teachers t ON t.id = s.teacher_id
         LEFT JOIN persons p ON p.id = t.person_id
         LEFT JOIN classrooms c ON c.id = s.classroom_id
         ORDER BY d.name, s.label",
        PERSON_NAME_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "Subjects",
        &["Label", "Department", "Teacher", "Classroom"],
        Role::Admin,
    )
    .with_create("subjects.form");
    for (id, label, department, teacher, room) in rows {
        let teacher = teacher.unwrap_or_else(|| UNASSIGNED.to_string());
        let room = room.unwrap_or_else(|| UNASSIGNED.to_string());
        list.push(
            ListItem::new(
                id,
                vec![json!(label), json!(department), json!(teacher), json!(room)],
            )
            .editable("subjects.update")
            .deletable("subjects.delete"),
        );
    }
    list.render()
}

fn subjects_form(conn: &Connection) -> Result<Value, HandlerErr> {
    FormPage::new("Create a subject", "subjects.create", "subjects.list", Role::Admin)
        .field(FormField::text("label", "Label"))
        .field(FormField::select("departmentId", "Department", lookups::departments(conn)?))
        .field(FormField::select("teacherId", "Teacher", lookups::teachers(conn)?).optional())
        .field(FormField::select("classroomId", "Classroom", lookups::classrooms(conn)?).optional())
        .render()
}

fn subjects_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let label = get_required_str(params, "label")?;
    let department_id = get_required_str(params, "departmentId")?;
    let teacher_id = get_optional_str(params, "teacherId")?;
    let classroom_id = get_optional_str(params, "classroomId")?;
    require_exists(conn, "departments", &department_id, "department")?;
    require_optional_exists(conn, "teachers", teacher_id.as_deref(), "teacher")?;
    require_optional_exists(conn, "classrooms", classroom_id.as_deref(), "classroom")?;

    let subject_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subjects(id, label, department_id, teacher_id, classroom_id)
         VALUES(?, ?, ?, ?, ?)",
        (&subject_id, &label, &department_id, &teacher_id, &classroom_id),
    )?;
    tracing::info!(subject_id = %subject_id, "subject created");
    let mut out = redirect("subjects.list", "Subject created.");
    out["subjectId"] = json!(subject_id);
    Ok(out)
}

fn subjects_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    let patch = get_patch(params)?;
    let mut row = load_subject(conn, &subject_id)?;

    if let Some(v) = patch_str(patch, "label", true)? {
        row.label = v;
    }
    if let Some(v) = patch_str(patch, "departmentId", true)? {
        require_exists(conn, "departments", &v, "department")?;
        row.department_id = v;
    }
    if let Some(v) = patch_optional_ref(patch, "teacherId")? {
        require_optional_exists(conn, "teachers", v.as_deref(), "teacher")?;
        row.teacher_id = v;
    }
    if let Some(v) = patch_optional_ref(patch, "classroomId")? {
        require_optional_exists(conn, "classrooms", v.as_deref(), "classroom")?;
        row.classroom_id = v;
    }

    conn.execute(
        "UPDATE subjects SET label = ?, department_id = ?, teacher_id = ?, classroom_id = ?
         WHERE id = ?",
        (
            &row.label,
            &row.department_id,
            &row.teacher_id,
            &row.classroom_id,
            &subject_id,
        ),
    )?;
    Ok(redirect("subjects.list", "Subject updated."))
}

/// Cascades to the subject's grades, course content and attendance.
fn subjects_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    let n = conn.execute("DELETE FROM subjects WHERE id = ?", [&subject_id])?;
    if n == 0 {
        return Err(HandlerErr::not_found("subject"));
    }
    tracing::info!(subject_id = %subject_id, "subject deleted");
    Ok(redirect("subjects.list", "Subject deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "subjects.list" => Some(with_admin(state, req, |conn, _, _| subjects_list(conn))),
        "subjects.form" => Some(with_admin(state, req, |conn, _, _| subjects_form(conn))),
        "subjects.create" => Some(with_admin(state, req, |conn, _, p| subjects_create(conn, p))),
        "subjects.update" => Some(with_admin(state, req, |conn, _, p| subjects_update(conn, p))),
        "subjects.delete" => Some(with_admin(state, req, |conn, _, p| subjects_delete(conn, p))),
        _ => None,
    }
}
