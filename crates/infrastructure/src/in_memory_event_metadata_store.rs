use std::collections::HashMap;

use async_trait::async_trait;
use tactic_application::{
    BatchRun, EventMetadataRecord, EventMetadataStore, FallbackResult, WorkflowRun,
};
use tactic_core::{AppError, AppResult, EventId};
use tokio::sync::RwLock;

/// In-memory metadata and audit store.
#[derive(Debug, Default)]
pub struct InMemoryEventMetadataStore {
    events: RwLock<HashMap<EventId, EventMetadataRecord>>,
    workflow_runs: RwLock<Vec<WorkflowRun>>,
    batches: RwLock<Vec<BatchRun>>,
    fallbacks: RwLock<Vec<FallbackResult>>,
}

impl InMemoryEventMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the summary row of one event.
    pub async fn event_metadata(&self, event_id: EventId) -> Option<EventMetadataRecord> {
        self.events.read().await.get(&event_id).cloned()
    }

    /// Returns persisted workflow runs in write order.
    pub async fn workflow_runs(&self) -> Vec<WorkflowRun> {
        self.workflow_runs.read().await.clone()
    }

    /// Returns persisted batches in write order.
    pub async fn batches(&self) -> Vec<BatchRun> {
        self.batches.read().await.clone()
    }

    /// Returns persisted correction attempts in write order.
    pub async fn fallback_results(&self) -> Vec<FallbackResult> {
        self.fallbacks.read().await.clone()
    }
}

#[async_trait]
impl EventMetadataStore for InMemoryEventMetadataStore {
    async fn store_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()> {
        let mut events = self.events.write().await;
        if events.contains_key(&record.event_id) {
            return Err(AppError::Conflict(format!(
                "metadata for event '{}' already exists",
                record.event_id
            )));
        }

        events.insert(record.event_id, record);
        Ok(())
    }

    async fn update_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()> {
        self.events.write().await.insert(record.event_id, record);
        Ok(())
    }

    async fn store_workflow_result(&self, run: &WorkflowRun) -> AppResult<()> {
        self.workflow_runs.write().await.push(run.clone());
        Ok(())
    }

    async fn store_batch_result(&self, batch: &BatchRun) -> AppResult<()> {
        self.batches.write().await.push(batch.clone());
        Ok(())
    }

    async fn store_fallback_result(&self, result: &FallbackResult) -> AppResult<()> {
        self.fallbacks.write().await.push(result.clone());
        Ok(())
    }
}
