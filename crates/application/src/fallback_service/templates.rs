use serde_json::{Value, json};
use tactic_domain::{EventPayload, EventType};

/// Title written when a payload has none.
pub(super) const DEFAULT_TITLE: &str = "Untitled Event";

/// Value injected for a missing field.
pub(super) fn missing_field_default(field: &str) -> Value {
    match field {
        "title" => json!(DEFAULT_TITLE),
        "event_type" => json!("general"),
        "date" => Value::Null,
        "status" => json!("draft"),
        "capacity" => json!(100),
        "duration" => json!(2),
        "price" => json!(0),
        _ => json!(""),
    }
}

/// Known-valid value for a field whose value was rejected.
pub(super) fn valid_field_default(field: &str) -> Value {
    match field {
        "metadata" | "form_fields" | "layout" => json!({}),
        other => missing_field_default(other),
    }
}

/// Static starting payload for event types that have one.
pub(super) fn event_template(event_type: &EventType) -> Option<EventPayload> {
    let template = match event_type {
        EventType::Conference => json!({
            "title": "Conference Event",
            "event_type": "conference",
            "description": "A professional conference event",
            "capacity": 100,
            "duration": 8,
            "status": "draft",
        }),
        EventType::Workshop => json!({
            "title": "Workshop Event",
            "event_type": "workshop",
            "description": "An interactive workshop session",
            "capacity": 30,
            "duration": 4,
            "status": "draft",
        }),
        EventType::Meeting => json!({
            "title": "Meeting",
            "event_type": "meeting",
            "description": "A team meeting",
            "capacity": 10,
            "duration": 1,
            "status": "draft",
        }),
        _ => return None,
    };

    EventPayload::from_value(template).ok()
}
