use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tactic_core::{AppResult, EventId};
use tactic_domain::EventPayload;

/// Kind of dependent data refreshed after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Data derived from the event type.
    EventType,
    /// Data derived from the venue.
    Venue,
    /// Data derived from the event date.
    Date,
}

impl DependencyKind {
    /// Maps a changed payload field to its dependency kind.
    #[must_use]
    pub fn for_field(field: &str) -> Option<Self> {
        match field {
            "event_type" => Some(Self::EventType),
            "venue" => Some(Self::Venue),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventType => "event_type",
            Self::Venue => "venue",
            Self::Date => "date",
        }
    }
}

/// Port for best-effort downstream work triggered by the pipeline.
#[async_trait]
pub trait EventSideEffects: Send + Sync {
    /// Refreshes events related to a newly created one.
    async fn update_related_events(&self, event_id: EventId, payload: &EventPayload)
    -> AppResult<()>;

    /// Notifies subscribers about a newly created event.
    async fn send_creation_notifications(
        &self,
        event_id: EventId,
        payload: &EventPayload,
    ) -> AppResult<()>;

    /// Records analytics for a newly created event.
    async fn update_analytics(&self, event_id: EventId, payload: &EventPayload) -> AppResult<()>;

    /// Propagates one changed field to its dependents.
    async fn propagate_dependency(
        &self,
        event_id: EventId,
        kind: DependencyKind,
        value: &Value,
    ) -> AppResult<()>;
}
