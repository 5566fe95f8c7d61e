use std::fmt::{Display, Formatter};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventPayload, EventStatus, EventType, is_empty_value, parse_event_date};
use crate::form::FormFields;

/// Fields every persisted event must carry.
pub const REQUIRED_EVENT_FIELDS: [&str; 2] = ["title", "event_type"];

const TITLE_MIN_LENGTH: usize = 3;
const TITLE_MAX_LENGTH: usize = 200;
const DESCRIPTION_MAX_LENGTH: usize = 2000;
const CAPACITY_MAX: i64 = 10_000;
const METADATA_SOFT_LIMIT: usize = 50;
const SENSITIVE_METADATA_MARKERS: [&str; 6] =
    ["password", "secret", "key", "token", "ssn", "credit_card"];

/// Machine-readable validation failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// A required field is absent or empty.
    MissingRequired,
    /// The value has the wrong JSON type.
    InvalidType,
    /// The value does not match the expected textual format.
    InvalidFormat,
    /// The value is outside the accepted set or range.
    InvalidValue,
    /// The value is shorter than allowed.
    TooShort,
    /// The value is longer than allowed.
    TooLong,
    /// Metadata carries a key that looks like a credential.
    SensitiveData,
    /// Non-blocking observation.
    Warning,
    /// Free-form message that could not be classified.
    Unclassified,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Human-readable message.
    pub message: String,
    /// Field the finding refers to.
    pub field: Option<String>,
    /// Failure code.
    pub code: ValidationCode,
}

impl ValidationIssue {
    /// Creates a finding for one field.
    #[must_use]
    pub fn new(code: ValidationCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
            code,
        }
    }

    /// Classifies a bare error string by the phrases it contains.
    ///
    /// Used when errors arrive as plain text from callers instead of from
    /// [`EventValidator`].
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        let code = if lowered.contains("missing required field") {
            ValidationCode::MissingRequired
        } else if lowered.contains("invalid format") || lowered.contains("format") {
            ValidationCode::InvalidFormat
        } else if lowered.contains("invalid value") || lowered.contains("invalid status") {
            ValidationCode::InvalidValue
        } else if lowered.contains("invalid type") || lowered.contains("must be an integer") {
            ValidationCode::InvalidType
        } else if lowered.contains("at least") {
            ValidationCode::TooShort
        } else if lowered.contains("less than") {
            ValidationCode::TooLong
        } else if lowered.contains("sensitive") {
            ValidationCode::SensitiveData
        } else {
            ValidationCode::Unclassified
        };

        Self {
            message: message.to_owned(),
            field: extract_field_name(message),
            code,
        }
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.message.as_str())
    }
}

/// Extracts the field a free-form error message refers to.
///
/// Looks for the word following `field` first, then for a leading known field name
/// such as `Capacity must be ...`.
#[must_use]
pub fn extract_field_name(message: &str) -> Option<String> {
    let words: Vec<&str> = message.split_whitespace().collect();
    let after_field = words
        .iter()
        .position(|word| word.trim_end_matches(':').eq_ignore_ascii_case("field"))
        .and_then(|index| words.get(index + 1))
        .map(|word| {
            word.trim_matches(|character: char| {
                !character.is_ascii_alphanumeric() && character != '_'
            })
        })
        .filter(|word| !word.is_empty());

    if let Some(field) = after_field {
        return Some(field.to_owned());
    }

    const KNOWN_FIELDS: [&str; 12] = [
        "title",
        "description",
        "event_type",
        "status",
        "capacity",
        "duration",
        "price",
        "date",
        "email",
        "phone",
        "metadata",
        "venue",
    ];

    words.iter().take(2).find_map(|word| {
        let candidate = word
            .trim_matches(|character: char| !character.is_ascii_alphanumeric() && character != '_')
            .to_lowercase();
        KNOWN_FIELDS
            .iter()
            .find(|known| **known == candidate)
            .map(|known| (*known).to_owned())
    })
}

/// Outcome of validating one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Blocking findings.
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking findings.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns whether there are no blocking findings.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns error messages in order.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    fn error(&mut self, code: ValidationCode, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(code, field, message));
    }

    fn warning(&mut self, field: &str, message: impl Into<String>) {
        self.warnings
            .push(ValidationIssue::new(ValidationCode::Warning, field, message));
    }
}

/// Rule set for event payloads and generated forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventValidator;

impl EventValidator {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates one event payload.
    #[must_use]
    pub fn validate(&self, payload: &EventPayload) -> ValidationReport {
        let mut report = ValidationReport::default();

        validate_required_fields(payload, &mut report);
        validate_field_types(payload, &mut report);
        validate_field_values(payload, &mut report);
        validate_business_rules(payload, &mut report);

        report
    }

    /// Validates the structure of a generated form.
    #[must_use]
    pub fn validate_form_fields(&self, form: &FormFields) -> ValidationReport {
        let mut report = ValidationReport::default();
        if form.fields.is_empty() {
            report.error(
                ValidationCode::MissingRequired,
                "fields",
                "Missing required field: fields",
            );
        }

        for (index, field) in form.fields.iter().enumerate() {
            let prefix = format!("fields[{index}]");
            let name_is_identifier = field
                .name
                .chars()
                .next()
                .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
                && field
                    .name
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '_');
            if !name_is_identifier {
                report.error(
                    ValidationCode::InvalidFormat,
                    format!("{prefix}.name").as_str(),
                    format!(
                        "Invalid format for field {prefix}.name: must start with a letter or underscore and contain only letters, numbers, and underscores"
                    ),
                );
            }

            if let crate::form::FieldType::Other(other) = &field.field_type {
                report.error(
                    ValidationCode::InvalidValue,
                    format!("{prefix}.type").as_str(),
                    format!("Invalid value for field {prefix}.type: '{other}'"),
                );
            }

            if field.label.trim().is_empty() {
                report.warning(
                    format!("{prefix}.label").as_str(),
                    "Field label should be a non-empty string",
                );
            }

            if field.field_type.requires_options() && field.options.is_empty() {
                report.error(
                    ValidationCode::MissingRequired,
                    format!("{prefix}.options").as_str(),
                    format!(
                        "Missing required field: {prefix}.options for type '{}'",
                        field.field_type.as_str()
                    ),
                );
            }
        }

        report
    }
}

fn validate_required_fields(payload: &EventPayload, report: &mut ValidationReport) {
    for field in REQUIRED_EVENT_FIELDS {
        if !payload.has_value(field) {
            report.error(
                ValidationCode::MissingRequired,
                field,
                format!("Missing required field: {field}"),
            );
        }
    }
}

fn validate_field_types(payload: &EventPayload, report: &mut ValidationReport) {
    let checks: [(&str, fn(&Value) -> bool, &str); 11] = [
        ("title", Value::is_string, "must be a string"),
        ("description", Value::is_string, "must be a string"),
        ("event_type", Value::is_string, "must be a string"),
        ("status", Value::is_string, "must be a string"),
        ("capacity", is_integer, "must be an integer"),
        ("duration", is_integer, "must be an integer"),
        ("price", Value::is_number, "must be a number"),
        ("date", Value::is_string, "must be a valid date string"),
        ("metadata", Value::is_object, "must be an object"),
        ("form_fields", Value::is_object, "must be an object"),
        ("layout", Value::is_object, "must be an object"),
    ];

    for (field, is_expected_type, expectation) in checks {
        let Some(value) = payload.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if !is_expected_type(value) {
            report.error(
                ValidationCode::InvalidType,
                field,
                format!("Invalid type for field {field}: {expectation}"),
            );
        }
    }
}

fn validate_field_values(payload: &EventPayload, report: &mut ValidationReport) {
    if let Some(title) = payload.get("title").and_then(Value::as_str) {
        let length = title.trim().chars().count();
        if length > 0 && length < TITLE_MIN_LENGTH {
            report.error(
                ValidationCode::TooShort,
                "title",
                format!("Invalid value for field title: must be at least {TITLE_MIN_LENGTH} characters long"),
            );
        } else if title.chars().count() > TITLE_MAX_LENGTH {
            report.error(
                ValidationCode::TooLong,
                "title",
                format!("Invalid value for field title: must be less than {TITLE_MAX_LENGTH} characters"),
            );
        }
    }

    if let Some(description) = payload.get("description").and_then(Value::as_str)
        && description.chars().count() > DESCRIPTION_MAX_LENGTH
    {
        report.error(
            ValidationCode::TooLong,
            "description",
            format!(
                "Invalid value for field description: must be less than {DESCRIPTION_MAX_LENGTH} characters"
            ),
        );
    }

    if let Some(event_type) = payload.event_type()
        && !event_type.is_known()
    {
        report.warning(
            "event_type",
            format!(
                "Unknown event type: {}. Valid types: {}",
                event_type.as_str(),
                EventType::KNOWN.join(", ")
            ),
        );
    }

    if let Some(status) = payload.str_field("status")
        && EventStatus::parse(status).is_err()
    {
        report.error(
            ValidationCode::InvalidValue,
            "status",
            format!(
                "Invalid value for field status: '{status}'. Valid statuses: {}",
                EventStatus::ALL.join(", ")
            ),
        );
    }

    if let Some(capacity) = payload.get("capacity").and_then(Value::as_i64) {
        if capacity < 1 {
            report.error(
                ValidationCode::InvalidValue,
                "capacity",
                "Invalid value for field capacity: must be at least 1",
            );
        } else if capacity > CAPACITY_MAX {
            report.error(
                ValidationCode::InvalidValue,
                "capacity",
                "Invalid value for field capacity: must be less than 10,000",
            );
        }
    }

    if let Some(duration) = payload.get("duration").and_then(Value::as_i64) {
        if duration < 0 {
            report.error(
                ValidationCode::InvalidValue,
                "duration",
                "Invalid value for field duration: must be non-negative",
            );
        } else if duration > 24 {
            report.warning("duration", "Duration is unusually long (>24 hours)");
        }
    }

    if let Some(price) = payload.get("price").and_then(Value::as_f64)
        && price < 0.0
    {
        report.error(
            ValidationCode::InvalidValue,
            "price",
            "Invalid value for field price: must be non-negative",
        );
    }

    if let Some(email) = payload.str_field("email")
        && !looks_like_email(email)
    {
        report.error(
            ValidationCode::InvalidFormat,
            "email",
            format!("Invalid format for field email: '{email}' is not an email address"),
        );
    }

    if let Some(phone) = payload.str_field("phone")
        && !looks_like_phone(phone)
    {
        report.error(
            ValidationCode::InvalidFormat,
            "phone",
            "Invalid format for field phone: not a phone number",
        );
    }

    if let Some(date) = payload.str_field("date") {
        match parse_event_date(date) {
            Some(parsed) if parsed < Utc::now() => {
                report.warning("date", "Event date is in the past");
            }
            Some(_) => {}
            None => report.error(
                ValidationCode::InvalidFormat,
                "date",
                "Invalid format for field date: use ISO format (YYYY-MM-DDTHH:MM:SS)",
            ),
        }
    }
}

fn validate_business_rules(payload: &EventPayload, report: &mut ValidationReport) {
    let event_type = payload.event_type();
    let published = payload.str_field("status") == Some(EventStatus::Published.as_str());

    if event_type == Some(EventType::Conference) && !payload.has_value("capacity") {
        report.warning("capacity", "Conference events typically require a capacity");
    }

    if event_type == Some(EventType::Workshop) && !payload.has_value("duration") {
        report.warning("duration", "Workshop events typically require a duration");
    }

    if published
        && matches!(event_type, Some(EventType::Conference | EventType::Workshop))
        && payload.get("price").is_none_or(Value::is_null)
    {
        report.warning("price", "Published events typically require a price");
    }

    if published
        && !["email", "phone", "contact_email", "contact_phone"]
            .iter()
            .any(|field| payload.contains_key(field))
    {
        report.warning("contact", "Published events should have contact information");
    }

    if let Some(metadata) = payload.get("metadata").and_then(Value::as_object) {
        if metadata.len() > METADATA_SOFT_LIMIT {
            report.warning("metadata", "Metadata has many fields, consider simplifying");
        }

        for key in metadata.keys() {
            if is_sensitive_metadata_key(key) {
                report.error(
                    ValidationCode::SensitiveData,
                    "metadata",
                    format!("Sensitive information detected in metadata: {key}"),
                );
            }
        }
    }
}

/// Returns whether a metadata key looks like it holds a credential.
#[must_use]
pub fn is_sensitive_metadata_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_METADATA_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn looks_like_phone(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|character| !matches!(character, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(compact.as_str());

    let mut characters = digits.chars();
    matches!(characters.next(), Some('1'..='9'))
        && digits.len() <= 16
        && characters.all(|character| character.is_ascii_digit())
}

/// Returns whether a payload value is filled in and of a required key.
#[must_use]
pub fn is_missing_required(payload: &EventPayload, field: &str) -> bool {
    payload.get(field).is_none_or(is_empty_value)
}
