use chrono::Utc;
use serde_json::{Value, json};
use tactic_domain::{EventPayload, EventStatus, EventType, parse_event_date};

const TRIMMED_FIELDS: [&str; 3] = ["title", "description", "event_type"];

/// Trims text fields and rewrites parseable dates as RFC 3339 UTC.
pub(super) fn normalize_payload(payload: &EventPayload) -> EventPayload {
    let mut normalized = payload.clone();

    for field in TRIMMED_FIELDS {
        if let Some(Value::String(text)) = normalized.get(field) {
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                let trimmed = trimmed.to_owned();
                normalized.insert(field, Value::String(trimmed));
            }
        }
    }

    if let Some(parsed) = normalized
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_event_date)
    {
        normalized.insert("date", Value::String(parsed.to_rfc3339()));
    }

    normalized
}

/// Fills business defaults for fields the caller left empty.
pub(super) fn apply_business_defaults(payload: &mut EventPayload) {
    if !payload.has_value("status") {
        payload.insert("status", json!(EventStatus::Draft.as_str()));
    }
    if !payload.has_value("created_at") {
        payload.insert("created_at", json!(Utc::now().to_rfc3339()));
    }

    match payload.event_type() {
        Some(EventType::Conference) if !payload.has_value("capacity") => {
            payload.insert("capacity", json!(100));
        }
        Some(EventType::Workshop) if !payload.has_value("duration") => {
            payload.insert("duration", json!(2));
        }
        _ => {}
    }
}
