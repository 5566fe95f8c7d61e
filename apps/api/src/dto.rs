use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tactic_domain::{EventDocument, EventPayload, FormFields};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage_backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Incoming payload for batch creation.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub events: Vec<EventPayload>,
}

/// API representation of a stored event.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub event_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    pub metadata: Map<String, Value>,
    pub form_fields: FormFields,
    pub data: EventPayload,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<EventDocument> for EventResponse {
    fn from(document: EventDocument) -> Self {
        Self {
            event_id: document.event_id().to_string(),
            event_type: document.event_type().as_str().to_owned(),
            title: document.title().to_owned(),
            description: document.description().map(ToOwned::to_owned),
            status: document.status().to_owned(),
            metadata: document.metadata().clone(),
            form_fields: document.form_fields().clone(),
            data: document.data().clone(),
            created_at: document.created_at(),
            updated_at: document.updated_at(),
        }
    }
}
