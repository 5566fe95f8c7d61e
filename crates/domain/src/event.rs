use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tactic_core::{AppError, AppResult, EventId};

use crate::form::FormFields;

/// Known event categories with an escape hatch for free-form types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Multi-session conference.
    Conference,
    /// Hands-on workshop.
    Workshop,
    /// Internal or external meeting.
    Meeting,
    /// Seminar session.
    Seminar,
    /// Online webinar.
    Webinar,
    /// Generic event without a dedicated template.
    General,
    /// Any other declared type, kept verbatim.
    Other(String),
}

impl EventType {
    /// Names of the built-in event types.
    pub const KNOWN: [&'static str; 6] = [
        "conference",
        "workshop",
        "meeting",
        "seminar",
        "webinar",
        "general",
    ];

    /// Parses a declared type value. Unknown values are kept as [`EventType::Other`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "conference" => Self::Conference,
            "workshop" => Self::Workshop,
            "meeting" => Self::Meeting,
            "seminar" => Self::Seminar,
            "webinar" => Self::Webinar,
            "general" => Self::General,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Conference => "conference",
            Self::Workshop => "workshop",
            Self::Meeting => "meeting",
            Self::Seminar => "seminar",
            Self::Webinar => "webinar",
            Self::General => "general",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Returns whether the type is one of the built-in categories.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::parse(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_owned()
    }
}

/// Publication status values accepted on event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Not yet published.
    Draft,
    /// Visible to attendees.
    Published,
    /// Cancelled by the organizer.
    Cancelled,
    /// Already took place.
    Completed,
}

impl EventStatus {
    /// Names of all accepted status values.
    pub const ALL: [&'static str; 4] = ["draft", "published", "cancelled", "completed"];

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parses a storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(AppError::Validation(format!(
                "unknown event status '{value}'"
            ))),
        }
    }
}

/// Returns true for values that count as "not filled in".
///
/// `null`, blank strings, empty arrays and empty objects are empty. Numbers and
/// booleans always count as values, including `0` and `false`.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Parses an event date string in RFC 3339 or naive ISO form (`YYYY-MM-DDTHH:MM:SS`).
#[must_use]
pub fn parse_event_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    let without_zone = trimmed.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(without_zone, format).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(without_zone, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Open-schema event submission.
///
/// Fields vary by event type, so the payload keeps every key it was given and
/// exposes typed accessors for the keys the pipeline understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(Map<String, Value>);

impl EventPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object.
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value into a payload. Only objects are accepted.
    pub fn from_value(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::Validation(format!(
                "event payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Returns the raw value for one key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value for one key when it is not empty.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !is_empty_value(value))
    }

    /// Returns whether the key holds a non-empty value.
    #[must_use]
    pub fn has_value(&self, key: &str) -> bool {
        self.get_non_empty(key).is_some()
    }

    /// Returns whether the key is present at all.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns a non-blank string value for one key.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Sets one key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes one key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Event title when present and non-blank.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    /// Declared event type when present.
    #[must_use]
    pub fn event_type(&self) -> Option<EventType> {
        self.str_field("event_type").map(EventType::parse)
    }

    /// Declared event type, defaulting to [`EventType::General`].
    #[must_use]
    pub fn event_type_or_general(&self) -> EventType {
        self.event_type().unwrap_or(EventType::General)
    }

    /// Iterates over all keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the payload has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Returns a copy of this payload with every key of `overlay` written on top.
    #[must_use]
    pub fn overlaid_with(&self, overlay: &EventPayload) -> EventPayload {
        let mut merged = self.clone();
        for (key, value) in overlay.iter() {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl From<Map<String, Value>> for EventPayload {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl FromIterator<(String, Value)> for EventPayload {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Persisted event document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDocument {
    event_id: EventId,
    event_type: EventType,
    title: String,
    description: Option<String>,
    metadata: Map<String, Value>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    form_fields: FormFields,
    data: EventPayload,
}

impl EventDocument {
    /// Creates a document from a validated payload.
    pub fn new(
        event_id: EventId,
        data: EventPayload,
        form_fields: FormFields,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let title = data
            .title()
            .ok_or_else(|| AppError::Validation("event document requires a title".to_owned()))?
            .to_owned();
        let event_type = data.event_type().ok_or_else(|| {
            AppError::Validation("event document requires an event_type".to_owned())
        })?;
        let description = data.str_field("description").map(ToOwned::to_owned);
        let metadata = data
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let status = data
            .str_field("status")
            .unwrap_or(EventStatus::Draft.as_str())
            .to_owned();

        Ok(Self {
            event_id,
            event_type,
            title,
            description,
            metadata,
            status,
            created_at,
            updated_at: None,
            form_fields,
            data,
        })
    }

    /// Applies an update patch and re-derives the typed columns.
    pub fn apply_patch(&mut self, patch: &EventPayload, updated_at: DateTime<Utc>) -> AppResult<()> {
        let merged = self.data.overlaid_with(patch);
        let rebuilt = Self::new(
            self.event_id,
            merged,
            self.form_fields.clone(),
            self.created_at,
        )?;

        *self = Self {
            updated_at: Some(updated_at),
            ..rebuilt
        };
        Ok(())
    }

    /// Replaces the document form fields.
    pub fn set_form_fields(&mut self, form_fields: FormFields) {
        self.form_fields = form_fields;
    }

    /// Restores the last update timestamp of a document loaded from storage.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Returns the event identifier.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Returns the event title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns free-form metadata.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the stored status value.
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.as_str()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns the generated form fields.
    #[must_use]
    pub fn form_fields(&self) -> &FormFields {
        &self.form_fields
    }

    /// Returns the full stored payload.
    #[must_use]
    pub fn data(&self) -> &EventPayload {
        &self.data
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> EventPayload {
        EventPayload::from_value(value).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn event_type_round_trips_known_and_unknown_values() {
        assert_eq!(EventType::parse("conference"), EventType::Conference);
        assert_eq!(
            EventType::parse("hackathon"),
            EventType::Other("hackathon".to_owned())
        );
        assert!(!EventType::parse("hackathon").is_known());
        assert_eq!(EventType::parse(" webinar ").as_str(), "webinar");
    }

    #[test]
    fn empty_values_follow_fill_semantics() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn payload_rejects_non_objects() {
        assert!(EventPayload::from_value(json!(["a"])).is_err());
        assert!(EventPayload::from_value(json!("a")).is_err());
    }

    #[test]
    fn payload_preserves_unknown_keys() {
        let payload = payload(json!({"title": "Launch", "utm_campaign": "fall"}));
        assert_eq!(payload.get("utm_campaign"), Some(&json!("fall")));
        assert_eq!(payload.title(), Some("Launch"));
        assert_eq!(payload.event_type_or_general(), EventType::General);
    }

    #[test]
    fn parse_event_date_accepts_common_shapes() {
        assert!(parse_event_date("2026-05-01T10:00:00Z").is_some());
        assert!(parse_event_date("2026-05-01T10:00:00+02:00").is_some());
        assert!(parse_event_date("2026-05-01T10:00:00").is_some());
        assert!(parse_event_date("2026-05-01").is_some());
        assert!(parse_event_date("next tuesday").is_none());
    }

    #[test]
    fn document_requires_title_and_type() {
        let missing_title = EventDocument::new(
            EventId::new(),
            payload(json!({"event_type": "meeting"})),
            FormFields::default(),
            Utc::now(),
        );
        assert!(missing_title.is_err());

        let document = EventDocument::new(
            EventId::new(),
            payload(json!({"event_type": "meeting", "title": "Weekly sync"})),
            FormFields::default(),
            Utc::now(),
        );
        assert!(document.is_ok());
        let document = document.unwrap_or_else(|_| unreachable!());
        assert_eq!(document.status(), "draft");
        assert_eq!(document.event_type(), &EventType::Meeting);
    }

    #[test]
    fn apply_patch_rederives_typed_columns() {
        let created = EventDocument::new(
            EventId::new(),
            payload(json!({"event_type": "meeting", "title": "Weekly sync"})),
            FormFields::default(),
            Utc::now(),
        );
        let mut document = created.unwrap_or_else(|_| unreachable!());

        let result = document.apply_patch(
            &payload(json!({"title": "Monthly sync", "venue": "Room 4"})),
            Utc::now(),
        );
        assert!(result.is_ok());
        assert_eq!(document.title(), "Monthly sync");
        assert_eq!(document.data().get("venue"), Some(&json!("Room 4")));
        assert!(document.updated_at().is_some());
    }
}
