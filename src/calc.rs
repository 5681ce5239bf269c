use rusqlite::Connection;
use serde::Serialize;

/// Hours of absence charged per absent attendance row. Placeholder business
/// rule: every absence counts the same, regardless of lesson length.
pub const ABSENCE_HOURS_PER_RECORD: i64 = 1;

/// Two-decimal rounding, half away from zero.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Arithmetic mean rounded to two decimals; an empty input averages to 0.0.
pub fn mean_or_zero<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut count: usize = 0;
    let mut sum: f64 = 0.0;
    for v in values {
        count += 1;
        sum += v;
    }
    if count == 0 {
        return 0.0;
    }
    round_2_decimals(sum / (count as f64))
}

fn grade_values(conn: &Connection, sql: &str, key: &str) -> rusqlite::Result<Vec<f64>> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map([key], |r| r.get::<_, f64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

pub fn student_general_average(conn: &Connection, student_id: &str) -> rusqlite::Result<f64> {
    let values = grade_values(
        conn,
        "SELECT value FROM grades WHERE student_id = ?",
        student_id,
    )?;
    Ok(mean_or_zero(values))
}

pub fn subject_average(conn: &Connection, subject_id: &str) -> rusqlite::Result<f64> {
    let values = grade_values(
        conn,
        "SELECT value FROM grades WHERE subject_id = ?",
        subject_id,
    )?;
    Ok(mean_or_zero(values))
}

/// Mean over the flat pool of every grade in the department's subjects, so a
/// subject with many grades weighs more than one with few.
pub fn department_average(conn: &Connection, department_id: &str) -> rusqlite::Result<f64> {
    let values = grade_values(
        conn,
        "SELECT g.value
         FROM grades g
         JOIN subjects s ON s.id = g.subject_id
         WHERE s.department_id = ?",
        department_id,
    )?;
    Ok(mean_or_zero(values))
}

pub fn student_absence_count(conn: &Connection, student_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE student_id = ? AND present = 0",
        [student_id],
        |r| r.get(0),
    )
}

pub fn student_absence_hours(conn: &Connection, student_id: &str) -> rusqlite::Result<i64> {
    Ok(student_absence_count(conn, student_id)? * ABSENCE_HOURS_PER_RECORD)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: String,
    pub label: String,
    pub average: f64,
    pub grade_count: i64,
}

pub fn department_subject_averages(
    conn: &Connection,
    department_id: &str,
) -> rusqlite::Result<Vec<SubjectAverage>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.label, (SELECT COUNT(*) FROM grades g WHERE g.subject_id = s.id)
         FROM subjects s
         WHERE s.department_id = ?
         ORDER BY s.label",
    )?;
    let rows = stmt
        .query_map([department_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (subject_id, label, grade_count) in rows {
        let average = subject_average(conn, &subject_id)?;
        out.push(SubjectAverage {
            subject_id,
            label,
            average,
            grade_count,
        });
    }
    Ok(out)
}
