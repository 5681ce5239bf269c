//! Id/label queries shared by forms and list pages.

use crate::ipc::error::HandlerErr;
use crate::model::Named;
use rusqlite::Connection;

/// SQL selecting a person's display name; expects the persons table aliased `p`.
pub const PERSON_NAME_SQL: &str = "p.first_name || ' ' || p.last_name";

fn query_named(conn: &Connection, sql: &str, key: Option<&str>) -> Result<Vec<Named>, HandlerErr> {
    let mut stmt = conn.prepare(sql)?;
    let map = |r: &rusqlite::Row<'_>| -> rusqlite::Result<Named> {
        Ok(Named {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    };
    let rows = match key {
        Some(key) => stmt.query_map([key], map)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

pub fn academies(conn: &Connection) -> Result<Vec<Named>, HandlerErr> {
    query_named(conn, "SELECT id, name FROM academies ORDER BY name", None)
}

pub fn colleges(conn: &Connection) -> Result<Vec<Named>, HandlerErr> {
    query_named(conn, "SELECT id, name FROM colleges ORDER BY name", None)
}

pub fn departments(conn: &Connection) -> Result<Vec<Named>, HandlerErr> {
    query_named(
        conn,
        "SELECT d.id, d.name || ' (' || c.name || ')'
         FROM departments d
         JOIN colleges c ON c.id = d.college_id
         ORDER BY d.name, c.name",
        None,
    )
}

pub fn teachers(conn: &Connection) -> Result<Vec<Named>, HandlerErr> {
    let sql = format!(
        "SELECT t.id, {PERSON_NAME_SQL}
         FROM teachers t
         JOIN persons p ON p.id = t.person_id
         ORDER BY p.last_name, p.first_name"
    );
    query_named(conn, &sql, None)
}

pub fn students(conn: &Connection) -> Result<Vec<Named>, HandlerErr> {
    let sql = format!(
        "SELECT s.id, {PERSON_NAME_SQL}
         FROM students s
         JOIN persons p ON p.id = s.person_id
         ORDER BY p.last_name, p.first_name"
    );
    query_named(conn, &sql, None)
}

pub fn classrooms(conn: &Connection) -> Result<Vec<Named>, HandlerErr> {
    query_named(
        conn,
        "SELECT id, 'Room ' || number FROM classrooms ORDER BY number",
        None,
    )
}

/// Subjects assigned to one teacher.
pub fn subjects_taught_by(conn: &Connection, teacher_id: &str) -> Result<Vec<Named>, HandlerErr> {
    query_named(
        conn,
        "SELECT id, label FROM subjects WHERE teacher_id = ? ORDER BY label",
        Some(teacher_id),
    )
}
