use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tactic_core::{AppResult, EventId};
use tactic_domain::{EventPayload, FormFields};

/// Outcome of one create or update handled by the event handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandledEvent {
    /// Persisted event identifier.
    pub event_id: EventId,
    /// Form fields stored with the event.
    pub form_fields: FormFields,
    /// Whether any autofill layer populated a field.
    pub autofill_applied: bool,
}

/// Port for the collaborator that persists events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Creates and persists one event.
    async fn create_event(&self, payload: EventPayload) -> AppResult<HandledEvent>;

    /// Applies a patch to one persisted event.
    async fn update_event(&self, event_id: EventId, patch: EventPayload)
    -> AppResult<HandledEvent>;
}
