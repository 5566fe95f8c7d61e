use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tactic_core::{AppError, AppResult, NonEmptyString};

use crate::event::is_empty_value;

/// Input widget type of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Single-line text.
    #[default]
    Text,
    /// Email address.
    Email,
    /// Telephone number.
    Tel,
    /// Numeric input.
    Number,
    /// Date picker.
    Date,
    /// Time picker.
    Time,
    /// Date-time picker.
    DateTime,
    /// Multi-line text.
    Textarea,
    /// Drop-down selection.
    Select,
    /// Boolean checkbox.
    Checkbox,
    /// Radio group.
    Radio,
    /// Unrecognized widget type, kept verbatim.
    Other(String),
}

impl FieldType {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Number => "number",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Returns whether the field type requires an options list.
    #[must_use]
    pub fn requires_options(&self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => Self::Text,
            "email" => Self::Email,
            "tel" => Self::Tel,
            "number" => Self::Number,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "textarea" => Self::Textarea,
            "select" => Self::Select,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            _ => Self::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_owned()
    }
}

/// Layer that populated an autofilled field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutofillSource {
    /// Deterministic field mapping rules.
    Rules,
    /// Generative-text suggestions.
    Ai,
    /// Majority value across similar cached events.
    Cache,
    /// Dependent defaults applied on the update path.
    Incremental,
}

impl AutofillSource {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Ai => "ai",
            Self::Cache => "cache",
            Self::Incremental => "incremental",
        }
    }
}

/// One generated form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Field key.
    pub name: String,
    /// Widget type.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Whether the attendee must answer.
    #[serde(default)]
    pub required: bool,
    /// Choices for select/radio fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    /// Current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Whether the current value came from autofill.
    #[serde(default)]
    pub autofilled: bool,
    /// Layer that produced the autofilled value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autofill_source: Option<AutofillSource>,
    /// Additional keys emitted by form generators.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormField {
    /// Creates an empty field.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        label: impl Into<String>,
        required: bool,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        Ok(Self {
            name: name.into(),
            field_type,
            label: label.into(),
            required,
            options: Vec::new(),
            value: None,
            autofilled: false,
            autofill_source: None,
            extra: Map::new(),
        })
    }

    /// Returns whether the field carries a non-empty value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|value| !is_empty_value(value))
    }

    /// Writes an autofilled value and tags its source.
    pub fn fill(&mut self, value: Value, source: AutofillSource) {
        self.value = Some(value);
        self.autofilled = true;
        self.autofill_source = Some(source);
    }
}

/// Form definition attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormFields {
    /// Ordered field list.
    #[serde(default)]
    pub fields: Vec<FormField>,
    /// Additional top-level keys emitted by form generators.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormFields {
    /// Creates a form from a field list.
    #[must_use]
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            extra: Map::new(),
        }
    }

    /// Parses a form definition produced by an external generator.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let form: Self = serde_json::from_value(value)
            .map_err(|error| AppError::Validation(format!("invalid form fields: {error}")))?;

        if let Some(index) = form
            .fields
            .iter()
            .position(|field| field.name.trim().is_empty())
        {
            return Err(AppError::Validation(format!(
                "invalid form fields: fields[{index}] has an empty name"
            )));
        }

        Ok(form)
    }

    /// Fallback contact form used when no generator output is available.
    pub fn default_contact_form() -> AppResult<Self> {
        Ok(Self::new(vec![
            FormField::new("name", FieldType::Text, "Name", true)?,
            FormField::new("email", FieldType::Email, "Email", true)?,
            FormField::new("phone", FieldType::Tel, "Phone Number", false)?,
        ]))
    }

    /// Returns whether the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns one field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Serializes the form to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
