use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tactic_core::{AppResult, EventId};
use tactic_domain::EventDocument;

use super::records::{BatchRun, FallbackResult, WorkflowRun};

/// Port for the primary event document store.
#[async_trait]
pub trait EventDocumentStore: Send + Sync {
    /// Stores a new document. Fails with `Conflict` if the identifier exists.
    async fn store(&self, document: EventDocument) -> AppResult<()>;

    /// Loads one document.
    async fn get(&self, event_id: EventId) -> AppResult<Option<EventDocument>>;

    /// Replaces an existing document. Fails with `NotFound` if absent.
    async fn update(&self, document: EventDocument) -> AppResult<()>;

    /// Deletes one document, returning whether it existed.
    async fn delete(&self, event_id: EventId) -> AppResult<bool>;
}

/// Queryable summary row written next to each event document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadataRecord {
    /// Event identifier.
    pub event_id: EventId,
    /// Event type storage value.
    pub event_type: String,
    /// Event title.
    pub title: String,
    /// Status storage value.
    pub status: String,
    /// Whether autofill populated any field.
    pub autofill_applied: bool,
    /// Number of generated form fields.
    pub form_field_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Port for the secondary metadata and audit store.
#[async_trait]
pub trait EventMetadataStore: Send + Sync {
    /// Writes the summary row of a new event.
    async fn store_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()>;

    /// Replaces the summary row of an updated event.
    async fn update_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()>;

    /// Persists one terminal workflow run.
    async fn store_workflow_result(&self, run: &WorkflowRun) -> AppResult<()>;

    /// Persists one finished batch.
    async fn store_batch_result(&self, batch: &BatchRun) -> AppResult<()>;

    /// Persists one correction attempt.
    async fn store_fallback_result(&self, result: &FallbackResult) -> AppResult<()>;
}
