use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::lookups;
use crate::ipc::helpers::{
    get_optional_str, get_required_i64, get_required_str, get_str_or_default, parse_date,
    require_exists, with_admin,
};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{redirect, FormField, FormPage, ListItem, ListPage, SelectOption};
use crate::model::{Person, Role};
use crate::session::AuthContext;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct NewPerson {
    pub last_name: String,
    pub first_name: String,
    pub phone: String,
    #[validate(email)]
    pub email: String,
    pub identifier: String,
}

impl NewPerson {
    pub fn from_params(params: &Value) -> Result<Self, HandlerErr> {
        let person = Self {
            last_name: get_required_str(params, "lastName")?,
            first_name: get_required_str(params, "firstName")?,
            phone: get_str_or_default(params, "phone")?,
            email: get_required_str(params, "email")?,
            identifier: get_required_str(params, "identifier")?,
        };
        person
            .validate()
            .map_err(|_| HandlerErr::bad_params("email is not a valid address"))?;
        Ok(person)
    }
}

/// Role-specific attributes collected alongside the person.
#[derive(Debug, Clone)]
pub enum NewRoleRecord {
    Admin,
    Teacher {
        department_id: String,
        seniority: i64,
        start_date: String,
    },
    Student {
        entry_year: i64,
    },
}

impl NewRoleRecord {
    pub fn from_params(params: &Value) -> Result<Self, HandlerErr> {
        let raw = get_required_str(params, "role")?;
        let role = Role::parse(&raw)
            .ok_or_else(|| HandlerErr::bad_params("role must be admin, teacher or student"))?;
        match role {
            Role::Admin => Ok(NewRoleRecord::Admin),
            Role::Teacher => {
                let start_date = match get_optional_str(params, "startDate")? {
                    Some(raw) => parse_date(&raw, "startDate")?,
                    None => Utc::now().date_naive().format("%Y-%m-%d").to_string(),
                };
                Ok(NewRoleRecord::Teacher {
                    department_id: get_required_str(params, "departmentId")?,
                    seniority: get_required_i64(params, "seniority")?,
                    start_date,
                })
            }
            Role::Student => Ok(NewRoleRecord::Student {
                entry_year: get_required_i64(params, "entryYear")?,
            }),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            NewRoleRecord::Admin => Role::Admin,
            NewRoleRecord::Teacher { .. } => Role::Teacher,
            NewRoleRecord::Student { .. } => Role::Student,
        }
    }
}

/// Inserts the person and its role record; returns `(person_id, record_id)`.
/// Callers own the transaction.
pub fn insert_person(
    conn: &Connection,
    person: &NewPerson,
    record: &NewRoleRecord,
) -> Result<(String, String), HandlerErr> {
    let person_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO persons(id, last_name, first_name, phone, email, identifier)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &person_id,
            &person.last_name,
            &person.first_name,
            &person.phone,
            &person.email,
            &person.identifier,
        ),
    )?;

    let record_id = Uuid::new_v4().to_string();
    match record {
        NewRoleRecord::Admin => {
            conn.execute(
                "INSERT INTO admins(id, person_id) VALUES(?, ?)",
                (&record_id, &person_id),
            )?;
        }
        NewRoleRecord::Teacher {
            department_id,
            seniority,
            start_date,
        } => {
            require_exists(conn, "departments", department_id, "department")?;
            conn.execute(
                "INSERT INTO teachers(id, person_id, seniority, start_date, department_id)
                 VALUES(?, ?, ?, ?, ?)",
                (&record_id, &person_id, seniority, start_date, department_id),
            )?;
        }
        NewRoleRecord::Student { entry_year } => {
            conn.execute(
                "INSERT INTO students(id, person_id, entry_year) VALUES(?, ?, ?)",
                (&record_id, &person_id, entry_year),
            )?;
        }
    }
    Ok((person_id, record_id))
}

fn people_list(conn: &Connection) -> Result<Value, HandlerErr> {
    let sql = format!(
        "SELECT {},
           EXISTS(SELECT 1 FROM admins a WHERE a.person_id = persons.id),
           EXISTS(SELECT 1 FROM teachers t WHERE t.person_id = persons.id),
           EXISTS(SELECT 1 FROM students s WHERE s.person_id = persons.id)
         FROM persons
         ORDER BY last_name, first_name",
        Person::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            let person = Person::from_row(r)?;
            let flags = [r.get::<_, bool>(6)?, r.get::<_, bool>(7)?, r.get::<_, bool>(8)?];
            Ok((person, flags))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut list = ListPage::new(
        "People",
        &["Name", "Email", "Identifier", "Roles"],
        Role::Admin,
    )
    .with_create("people.form");
    for (person, flags) in rows {
        let roles: Vec<&str> = Role::ALL
            .iter()
            .zip(flags)
            .filter(|(_, has)| *has)
            .map(|(role, _)| role.label())
            .collect();
        list.push(
            ListItem::new(
                person.id.clone(),
                vec![
                    json!(person.display_name()),
                    json!(person.email),
                    json!(person.identifier),
                    json!(roles.join(", ")),
                ],
            )
            .deletable("people.delete"),
        );
    }
    list.render()
}

fn people_form(conn: &Connection) -> Result<Value, HandlerErr> {
    let roles: Vec<SelectOption> = Role::ALL
        .iter()
        .map(|r| SelectOption::new(r.as_str(), r.label()))
        .collect();
    FormPage::new("Add a person", "people.create", "people.list", Role::Admin)
        .field(FormField::text("firstName", "First name"))
        .field(FormField::text("lastName", "Last name"))
        .field(FormField::text("email", "Email"))
        .field(FormField::text("identifier", "Login identifier"))
        .field(FormField::text("phone", "Phone").optional())
        .field(FormField::select("role", "Role", roles))
        .field(
            FormField::select("departmentId", "Department (teachers)", lookups::departments(conn)?)
                .optional(),
        )
        .field(FormField::number("seniority", "Seniority index (teachers)").optional())
        .field(FormField::date("startDate", "Start date (teachers)").optional())
        .field(FormField::number("entryYear", "Entry year (students)").optional())
        .render()
}

fn people_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let person = NewPerson::from_params(params)?;
    let record = NewRoleRecord::from_params(params)?;

    let tx = conn.unchecked_transaction()?;
    let (person_id, record_id) = insert_person(&tx, &person, &record)?;
    tx.commit()?;

    tracing::info!(person_id = %person_id, role = record.role().as_str(), "person created");
    let mut out = redirect("people.list", "Person created.");
    out["personId"] = json!(person_id);
    out["recordId"] = json!(record_id);
    Ok(out)
}

fn people_delete(conn: &Connection, auth: &AuthContext, params: &Value) -> Result<Value, HandlerErr> {
    let person_id = get_required_str(params, "personId")?;
    if person_id == auth.person_id {
        return Err(HandlerErr::bad_params("cannot delete the logged-in account"));
    }
    let n = conn.execute("DELETE FROM persons WHERE id = ?", [&person_id])?;
    if n == 0 {
        return Err(HandlerErr::not_found("person"));
    }
    tracing::info!(person_id = %person_id, "person deleted");
    Ok(redirect("people.list", "Person deleted."))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "people.list" => Some(with_admin(state, req, |conn, _, _| people_list(conn))),
        "people.form" => Some(with_admin(state, req, |conn, _, _| people_form(conn))),
        "people.create" => Some(with_admin(state, req, |conn, _, p| people_create(conn, p))),
        "people.delete" => Some(with_admin(state, req, people_delete)),
        _ => None,
    }
}
