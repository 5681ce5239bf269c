use crate::model::Role;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

/// Identity attached to a request once its session token has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub session_id: String,
    pub person_id: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid identifier")]
    UnknownIdentifier,
    #[error("incorrect user type for this account")]
    RoleMismatch,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum AccessDenied {
    #[error("login required")]
    NotAuthenticated,
    #[error("access not authorized")]
    WrongRole { required: Role, actual: Role },
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

pub fn has_role_record(conn: &Connection, person_id: &str, role: Role) -> rusqlite::Result<bool> {
    Ok(role_record_id(conn, person_id, role)?.is_some())
}

/// Id of the admin/teacher/student row owned by `person_id`, if any.
pub fn role_record_id(
    conn: &Connection,
    person_id: &str,
    role: Role,
) -> rusqlite::Result<Option<String>> {
    let sql = format!("SELECT id FROM {} WHERE person_id = ?", role.record_table());
    conn.query_row(&sql, [person_id], |r| r.get::<_, String>(0))
        .optional()
}

/// Identifier lookup plus role-record check. Nothing is written unless both
/// succeed, so a failed login never leaves a half-populated session behind.
pub fn login(conn: &Connection, identifier: &str, role: Role) -> Result<AuthContext, LoginError> {
    let person_id: Option<String> = conn
        .query_row(
            "SELECT id FROM persons WHERE identifier = ?",
            [identifier],
            |r| r.get(0),
        )
        .optional()?;
    let Some(person_id) = person_id else {
        return Err(LoginError::UnknownIdentifier);
    };
    if !has_role_record(conn, &person_id, role)? {
        return Err(LoginError::RoleMismatch);
    }

    let session_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO sessions(id, person_id, role, created_at) VALUES(?, ?, ?, ?)",
        (
            &session_id,
            &person_id,
            role.as_str(),
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(AuthContext {
        session_id,
        person_id,
        role,
    })
}

/// Returns whether a session row was removed.
pub fn logout(conn: &Connection, session_id: &str) -> rusqlite::Result<bool> {
    let n = conn.execute("DELETE FROM sessions WHERE id = ?", [session_id])?;
    Ok(n > 0)
}

pub fn resolve(conn: &Connection, session_id: &str) -> rusqlite::Result<Option<AuthContext>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT person_id, role FROM sessions WHERE id = ?",
            [session_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    // A row with an unknown role tag cannot authorize anything.
    Ok(row.and_then(|(person_id, role)| {
        Role::parse(&role).map(|role| AuthContext {
            session_id: session_id.to_string(),
            person_id,
            role,
        })
    }))
}

/// Gate for protected methods. `required = None` accepts any logged-in role.
pub fn authorize(
    conn: &Connection,
    session_id: Option<&str>,
    required: Option<Role>,
) -> Result<AuthContext, AccessDenied> {
    let Some(session_id) = session_id.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(AccessDenied::NotAuthenticated);
    };
    let Some(ctx) = resolve(conn, session_id)? else {
        return Err(AccessDenied::NotAuthenticated);
    };
    match required {
        Some(required) if required != ctx.role => Err(AccessDenied::WrongRole {
            required,
            actual: ctx.role,
        }),
        _ => Ok(ctx),
    }
}
