use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::lookups;
use crate::ipc::helpers::{
    get_patch, get_required_str, get_str_or_default, patch_str, require_exists, with_admin,
};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage};
use crate::model::Role;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::ValidateUrl;

#[derive(Debug, Clone)]
struct CollegeRow {
    name: String,
    address: String,
    phone: String,
    website: String,
    academy_id: String,
}

fn load_college(conn: &Connection, college_id: &str) -> Result<CollegeRow, HandlerErr> {
    conn.query_row(
        "SELECT name, address, phone, website, academy_id FROM colleges WHERE id = ?",
        [college_id],
        |r| {
            Ok(CollegeRow {
                name: r.get(0)?,
                address: r.get(1)?,
                phone: r.get(2)?,
                website: r.get(3)?,
                academy_id: r.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| HandlerErr::not_found("college"))
}

/// Website is optional; when given it must be an absolute URL.
fn check_website(website: &str) -> Result<(), HandlerErr> {
    if website.is_empty() || website.validate_url() {
        Ok(())
    } else {
        Err(HandlerErr::bad_params("website must be an absolute URL"))
    }
}

fn colleges_list(conn: &Connection) -> Result<Value, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.address, c.phone, a.name
         FROM colleges c
         JOIN academies a ON a.id = c.academy_id
         ORDER BY c.name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "Colleges",
        &["Name", "Address", "Phone", "Academy"],
        Role::Admin,
    )
    .with_create("colleges.form");
    for (id, name, address, phone, academy) in rows {
        list.push(
            ListItem::new(
                id,
                vec![json!(name), json!(address), json!(phone), json!(academy)],
            )
            .editable("colleges.update")
            .deletable("colleges.delete"),
        );
    }
    list.render()
}

fn colleges_form(conn: &Connection) -> Result<Value, HandlerErr> {
    FormPage::new("Create a college", "colleges.create", "colleges.list", Role::Admin)
        .field(FormField::text("name", "College name"))
        .field(FormField::textarea("address", "Address").optional())
        .field(FormField::text("phone", "Phone").optional())
        .field(FormField::text("website", "Website").optional())
        .field(FormField::select("academyId", "Academy", lookups::academies(conn)?))
        .render()
}

fn colleges_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let academy_id = get_required_str(params, "academyId")?;
    let address = get_str_or_default(params, "address")?;
    let phone = get_str_or_default(params, "phone")?;
    let website = get_str_or_default(params, "website")?;
    check_website(&website)?;
    require_exists(conn, "academies", &academy_id, "academy")?;

    let college_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO colleges(id, name, address, phone, website, academy_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&college_id, &name, &address, &phone, &website, &academy_id),
    )?;
    tracing::info!(college_id = %college_id, "college created");
    let mut out = redirect("colleges.list", "College created.");
    out["collegeId"] = json!(college_id);
    Ok(out)
}

fn colleges_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let college_id = get_required_str(params, "collegeId")?;
    let patch = get_patch(params)?;
    let mut row = load_college(conn, &college_id)?;

    if let Some(v) = patch_str(patch, "name", true)? {
        row.name = v;
    }
    if let Some(v) = patch_str(patch, "address", false)? {
        row.address = v;
    }
    if let Some(v) = patch_str(patch, "phone", false)? {
        row.phone = v;
    }
    if let Some(v) = patch_str(patch, "website", false)? {
        check_website(&v)?;
        row.website = v;
    }
    if let Some(v) = patch_str(patch, "academyId", true)? {
        require_exists(conn, "academies", &v, "academy")?;
        row.academy_id = v;
    }

    conn.execute(
        "UPDATE colleges SET name = ?, address = ?, phone = ?, website = ?, academy_id = ?
         WHERE id = ?",
        (
            &row.name,
            &row.address,
            &row.phone,
            &row.website,
            &row.academy_id,
            &college_id,
        ),
    )?;
    Ok(redirect("colleges.list", "College updated."))
}

/// Cascades to departments, their teachers and subjects.
fn colleges_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let college_id = get_required_str(params, "collegeId")?;
    let n = conn.execute("DELETE FROM colleges WHERE id = ?", [&college_id])?;
    if n == 0 {
        return Err(HandlerErr::not_found("college"));
    }
    tracing::info!(college_id = %college_id, "college deleted");
    Ok(redirect("colleges.list", "College deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "colleges.list" => Some(with_admin(state, req, |conn, _, _| colleges_list(conn))),
        "colleges.form" => Some(with_admin(state, req, |conn, _, _| colleges_form(conn))),
        "colleges.create" => Some(with_admin(state, req, |conn, _, p| colleges_create(conn, p))),
        "colleges.update" => Some(with_admin(state, req, |conn, _, p| colleges_update(conn, p))),
        "colleges.delete" => Some(with_admin(state, req, |conn, _, p| colleges_delete(conn, p))),
        _ => None,
    }
}
