use serde::{Deserialize, Serialize};

/// Which one-to-one role record a person is logged in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Teacher, Role::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Table holding the role record keyed by `person_id`.
    pub fn record_table(self) -> &'static str {
        match self {
            Role::Admin => "admins",
            Role::Teacher => "teachers",
            Role::Student => "students",
        }
    }

    pub fn dashboard_method(self) -> &'static str {
        match self {
            Role::Admin => "admin.dashboard",
            Role::Teacher => "teacher.dashboard",
            Role::Student => "student.dashboard",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Lesson,
    Exercise,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Lesson => "lesson",
            ContentKind::Exercise => "exercise",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lesson" => Some(ContentKind::Lesson),
            "exercise" => Some(ContentKind::Exercise),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Lesson => "Lesson",
            ContentKind::Exercise => "Exercise",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    pub phone: String,
    pub email: String,
    pub identifier: String,
}

impl Person {
    pub const COLUMNS: &'static str = "id, last_name, first_name, phone, email, identifier";

    pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            last_name: r.get(1)?,
            first_name: r.get(2)?,
            phone: r.get(3)?,
            email: r.get(4)?,
            identifier: r.get(5)?,
        })
    }

    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }

    /// One-line contact card shown on the profile page.
    pub fn card(&self) -> String {
        format!("{} | {} | {}", self.display_name(), self.email, self.phone)
    }
}

pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name, last_name)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRecord {
    pub id: String,
    pub seniority: i64,
    pub start_date: String,
    pub department_id: String,
    pub department_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub entry_year: i64,
}

/// Id/label pair used to fill select options and list cells.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Named {
    pub id: String,
    pub name: String,
}

pub const UNASSIGNED: &str = "Unassigned";
pub const NOT_AVAILABLE: &str = "N/A";

pub fn present_label(present: bool) -> &'static str {
    if present {
        "Present"
    } else {
        "Absent"
    }
}
