use crate::ipc::error::{HandlerErr, LOGIN_METHOD};
use crate::ipc::helpers::{get_required_str, with_db, with_role};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{page, redirect};
use crate::model::{Person, Role, StudentRecord, TeacherRecord};
use crate::session::{self, AuthContext};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};

fn auth_login(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let identifier = get_required_str(params, "identifier")?;
    let raw_role = get_required_str(params, "role")?;
    let role = Role::parse(&raw_role)
        .ok_or_else(|| HandlerErr::bad_params("role must be admin, teacher or student"))?;

    let auth = match session::login(conn, &identifier, role) {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!(identifier = %identifier, role = role.as_str(), reason = %e, "login refused");
            return Err(e.into());
        }
    };
    tracing::info!(person_id = %auth.person_id, role = role.as_str(), "login");

    let mut out = redirect(role.dashboard_method(), "Login successful.");
    out["sessionId"] = json!(auth.session_id);
    out["role"] = json!(role);
    Ok(out)
}

fn handle_auth_logout(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, _| {
        if let Some(session_id) = req.session.as_deref() {
            if session::logout(conn, session_id)? {
                tracing::info!("logout");
            }
        }
        Ok(redirect(LOGIN_METHOD, "You have been logged out."))
    })
}

fn load_person(conn: &Connection, person_id: &str) -> Result<Person, HandlerErr> {
    let sql = format!("SELECT {} FROM persons WHERE id = ?", Person::COLUMNS);
    conn.query_row(&sql, [person_id], Person::from_row)
        .optional()?
        .ok_or_else(|| HandlerErr::not_found("person"))
}

fn load_teacher(conn: &Connection, person_id: &str) -> Result<Option<TeacherRecord>, HandlerErr> {
    Ok(conn
        .query_row(
            "SELECT t.id, t.seniority, t.start_date, d.id, d.name
             FROM teachers t
             JOIN departments d ON d.id = t.department_id
             WHERE t.person_id = ?",
            [person_id],
            |r| {
                Ok(TeacherRecord {
                    id: r.get(0)?,
                    seniority: r.get(1)?,
                    start_date: r.get(2)?,
                    department_id: r.get(3)?,
                    department_name: r.get(4)?,
                })
            },
        )
        .optional()?)
}

fn load_student(conn: &Connection, person_id: &str) -> Result<Option<StudentRecord>, HandlerErr> {
    Ok(conn
        .query_row(
            "SELECT id, entry_year FROM students WHERE person_id = ?",
            [person_id],
            |r| {
                Ok(StudentRecord {
                    id: r.get(0)?,
                    entry_year: r.get(1)?,
                })
            },
        )
        .optional()?)
}

fn auth_profile(conn: &Connection, auth: &AuthContext) -> Result<Value, HandlerErr> {
    let person = load_person(conn, &auth.person_id)?;
    let teacher = match auth.role {
        Role::Teacher => load_teacher(conn, &auth.person_id)?,
        _ => None,
    };
    let student = match auth.role {
        Role::Student => load_student(conn, &auth.person_id)?,
        _ => None,
    };
    page(
        "profile",
        &json!({
            "card": person.card(),
            "person": person,
            "role": auth.role,
            "teacher": teacher,
            "student": student,
            "now": Utc::now().to_rfc3339(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "auth.login" => Some(with_db(state, req, auth_login)),
        "auth.logout" => Some(handle_auth_logout(state, req)),
        "auth.profile" => Some(with_role(state, req, None, |conn, auth, _| {
            auth_profile(conn, auth)
        })),
        _ => None,
    }
}
