//! Display payloads. A handler result names the template to render and hands
//! over its context; the front end owns the actual markup.

use crate::ipc::error::HandlerErr;
use crate::model::{Named, Role};
use serde::Serialize;
use serde_json::{json, Value};

pub const LIST_TEMPLATE: &str = "list_generic";
pub const FORM_TEMPLATE: &str = "form_generic";

pub fn page<T: Serialize>(template: &str, context: &T) -> Result<Value, HandlerErr> {
    Ok(json!({
        "template": template,
        "context": serde_json::to_value(context)?,
    }))
}

/// Result of a successful mutation: a flash message plus the method to open next.
pub fn redirect(to: &str, message: impl Into<String>) -> Value {
    json!({
        "redirect": to,
        "message": message.into(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: String,
    pub values: Vec<Value>,
    pub edit_method: Option<String>,
    pub delete_method: Option<String>,
}

impl ListItem {
    pub fn new(id: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            values,
            edit_method: None,
            delete_method: None,
        }
    }

    pub fn editable(mut self, update_method: &str) -> Self {
        self.edit_method = Some(update_method.to_string());
        self
    }

    pub fn deletable(mut self, delete_method: &str) -> Self {
        self.delete_method = Some(delete_method.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub title: String,
    pub headers: Vec<String>,
    pub items: Vec<ListItem>,
    pub create_method: Option<String>,
    pub role: Role,
}

impl ListPage {
    pub fn new(title: &str, headers: &[&str], role: Role) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            items: Vec::new(),
            create_method: None,
            role,
        }
    }

    pub fn with_create(mut self, form_method: &str) -> Self {
        self.create_method = Some(form_method.to_string());
        self
    }

    pub fn push(&mut self, item: ListItem) {
        self.items.push(item);
    }

    pub fn render(&self) -> Result<Value, HandlerErr> {
        page(LIST_TEMPLATE, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Date,
    Select,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

impl From<Named> for SelectOption {
    fn from(n: Named) -> Self {
        SelectOption::new(n.id, n.name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FormField {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: true,
            options: Vec::new(),
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn textarea(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Textarea)
    }

    pub fn number(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Date)
    }

    pub fn select<I>(name: &str, label: &str, options: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SelectOption>,
    {
        let mut f = Self::new(name, label, FieldKind::Select);
        f.options = options.into_iter().map(Into::into).collect();
        f
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPage {
    pub title: String,
    pub fields: Vec<FormField>,
    pub submit_method: String,
    pub back_method: String,
    pub role: Role,
}

impl FormPage {
    pub fn new(title: &str, submit_method: &str, back_method: &str, role: Role) -> Self {
        Self {
            title: title.to_string(),
            fields: Vec::new(),
            submit_method: submit_method.to_string(),
            back_method: back_method.to_string(),
            role,
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn render(&self) -> Result<Value, HandlerErr> {
        page(FORM_TEMPLATE, self)
    }
}
