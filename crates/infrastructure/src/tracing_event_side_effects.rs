use async_trait::async_trait;
use serde_json::Value;
use tactic_application::{DependencyKind, EventSideEffects};
use tactic_core::{AppResult, EventId};
use tactic_domain::EventPayload;
use tracing::info;

/// Side-effect adapter that only records the hooks in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSideEffects;

#[async_trait]
impl EventSideEffects for TracingEventSideEffects {
    async fn update_related_events(
        &self,
        event_id: EventId,
        payload: &EventPayload,
    ) -> AppResult<()> {
        info!(
            event_id = %event_id,
            event_type = payload.str_field("event_type").unwrap_or_default(),
            "related events refreshed"
        );
        Ok(())
    }

    async fn send_creation_notifications(
        &self,
        event_id: EventId,
        payload: &EventPayload,
    ) -> AppResult<()> {
        info!(
            event_id = %event_id,
            title = payload.title().unwrap_or_default(),
            "event creation notification sent"
        );
        Ok(())
    }

    async fn update_analytics(&self, event_id: EventId, payload: &EventPayload) -> AppResult<()> {
        info!(event_id = %event_id, fields = payload.len(), "event analytics updated");
        Ok(())
    }

    async fn propagate_dependency(
        &self,
        event_id: EventId,
        kind: DependencyKind,
        value: &Value,
    ) -> AppResult<()> {
        info!(
            event_id = %event_id,
            dependency = kind.as_str(),
            value = %value,
            "dependent data refreshed"
        );
        Ok(())
    }
}
