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

struct DepartmentRow {
    name: String,
    code: String,
    college_id: String,
    head_teacher_id: Option<String>,
}

fn load_department(conn: &Connection, department_id: &str) -> Result<DepartmentRow, HandlerErr> {
    conn.query_row(
        "SELECT name, code, college_id, head_teacher_id FROM departments WHERE id = ?",
        [department_id],
        |r| {
            Ok(DepartmentRow {
                name: r.get(0)?,
                code: r.get(1)?,
                college_id: r.get(2)?,
                head_teacher_id: r.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| HandlerErr::not_found("department"))
}

fn departments_list(conn: &Connection) -> Result<Value, HandlerErr> {
    let sql = format!(
        "SELECT d.id, d.name, d.code, c.name, {}
         FROM departments d
         JOIN colleges c ON c.id = d.college_id
         LEFT JOIN teachers t ON t.id = d.head_teacher_id
         LEFT JOIN persons p ON p.id = t.person_id
         ORDER BY c.name, d.name",
        PERSON_NAME_SQL
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "Departments",
        &["Name", "Code", "College", "Head"],
        Role::Admin,
    )
    .with_create("departments.form");
    for (id, name, code, college, head) in rows {
        let head = head.unwrap_or_else(|| UNASSIGNED.to_string());
        list.push(
            ListItem::new(id, vec![json!(name), json!(code), json!(college), json!(head)])
                .editable("departments.update")
                .deletable("departments.delete"),
        );
    }
    list.render()
}

fn departments_form(conn: &Connection) -> Result<Value, HandlerErr> {
    FormPage::new(
        "Create a department",
        "departments.create",
        "departments.list",
        Role::Admin,
    )
    .field(FormField::text("name", "Department name"))
    .field(FormField::text("code", "Code"))
    .field(FormField::select("collegeId", "College", lookups::colleges(conn)?))
    .field(FormField::select("headTeacherId", "Head of department", lookups::teachers(conn)?).optional())
    .render()
}

fn departments_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let code = get_required_str(params, "code")?;
    let college_id = get_required_str(params, "collegeId")?;
    let head_teacher_id = get_optional_str(params, "headTeacherId")?;
    require_exists(conn, "colleges", &college_id, "college")?;
    require_optional_exists(conn, "teachers", head_teacher_id.as_deref(), "teacher")?;

    let department_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO departments(id, name, code, college_id, head_teacher_id)
         VALUES(?, ?, ?, ?, ?)",
        (&department_id, &name, &code, &college_id, &head_teacher_id),
    )?;
    tracing::info!(department_id = %department_id, code = %code, "department created");
    let mut out = redirect("departments.list", "Department created.");
    out["departmentId"] = json!(department_id);
    Ok(out)
}

fn departments_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let department_id = get_required_str(params, "departmentId")?;
    let patch = get_patch(params)?;
    let mut row = load_department(conn, &department_id)?;

    if let Some(v) = patch_str(patch, "name", true)? {
        row.name = v;
    }
    if let Some(v) = patch_str(patch, "code", true)? {
        row.code = v;
    }
    if let Some(v) = patch_str(patch, "collegeId", true)? {
        require_exists(conn, "colleges", &v, "college")?;
        row.college_id = v;
    }
    if let Some(v) = patch_optional_ref(patch, "headTeacherId")? {
        require_optional_exists(conn, "teachers", v.as_deref(), "teacher")?;
        row.head_teacher_id = v;
    }

    conn.execute(
        "UPDATE departments SET name = ?, code = ?, college_id = ?, head_teacher_id = ?
         WHERE id = ?",
        (
            &row.name,
            &row.code,
            &row.college_id,
            &row.head_teacher_id,
            &department_id,
        ),
    )?;
    Ok(redirect("departments.list", "Department updated."))
}

fn departments_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let department_id = get_required_str(params, "departmentId")?;
    let n = conn.execute("DELETE FROM departments WHERE id = ?", [&department_id])?;
    if n == 0 {
        return Err(HandlerErr::not_found("department"));
    }
    tracing::info!(department_id = %department_id, "department deleted");
    Ok(redirect("departments.list", "Department deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "departments.list" => Some(with_admin(state, req, |conn, _, _| departments_list(conn))),
        "departments.form" => Some(with_admin(state, req, |conn, _, _| departments_form(conn))),
        "departments.create" => Some(with_admin(state, req, |conn, _, p| {
            departments_create(conn, p)
        })),
        "departments.update" => Some(with_admin(state, req, |conn, _, p| {
            departments_update(conn, p)
        })),
        "departments.delete" => Some(with_admin(state, req, |conn, _, p| {
            departments_delete(conn, p)
        })),
        _ => None,
    }
}
