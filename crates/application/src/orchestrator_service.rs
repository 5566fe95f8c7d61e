use std::sync::Arc;

use tactic_domain::{EventPayload, ValidationReport};
use tracing::warn;

use crate::event_ports::{
    EventDocumentStore, EventHandler, EventMetadataStore, EventPayloadValidator,
    EventSideEffects, WorkflowRun,
};
use crate::fallback_service::FallbackService;
use crate::pipeline_error::PipelineError;

mod batch;
mod creation;
mod normalize;
mod tracker;
mod update;

/// Upper bound on batch items processed at the same time.
pub const MAX_BATCH_CONCURRENCY: usize = 5;

/// Drives the creation, update and batch pipelines.
#[derive(Clone)]
pub struct OrchestratorService {
    validator: Arc<dyn EventPayloadValidator>,
    fallback: FallbackService,
    events: Arc<dyn EventHandler>,
    documents: Arc<dyn EventDocumentStore>,
    metadata_store: Arc<dyn EventMetadataStore>,
    side_effects: Arc<dyn EventSideEffects>,
    fallback_enabled: bool,
    batch_concurrency: usize,
}

impl OrchestratorService {
    /// Creates an orchestrator with fallback enabled and full batch concurrency.
    #[must_use]
    pub fn new(
        validator: Arc<dyn EventPayloadValidator>,
        fallback: FallbackService,
        events: Arc<dyn EventHandler>,
        documents: Arc<dyn EventDocumentStore>,
        metadata_store: Arc<dyn EventMetadataStore>,
        side_effects: Arc<dyn EventSideEffects>,
    ) -> Self {
        Self {
            validator,
            fallback,
            events,
            documents,
            metadata_store,
            side_effects,
            fallback_enabled: true,
            batch_concurrency: MAX_BATCH_CONCURRENCY,
        }
    }

    /// Enables or disables correction and recovery.
    #[must_use]
    pub fn with_fallback_enabled(mut self, fallback_enabled: bool) -> Self {
        self.fallback_enabled = fallback_enabled;
        self
    }

    /// Lowers batch concurrency. Values are clamped to `1..=MAX_BATCH_CONCURRENCY`.
    #[must_use]
    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency.clamp(1, MAX_BATCH_CONCURRENCY);
        self
    }

    /// Returns the standalone fallback service.
    #[must_use]
    pub fn fallback(&self) -> &FallbackService {
        &self.fallback
    }

    async fn validate(&self, payload: &EventPayload) -> Result<ValidationReport, PipelineError> {
        self.validator
            .validate(payload)
            .await
            .map_err(|error| PipelineError::Validation(vec![error.to_string()]))
    }

    async fn persist_run(&self, run: &WorkflowRun) {
        if let Err(error) = self.metadata_store.store_workflow_result(run).await {
            warn!(
                workflow_id = %run.workflow_id,
                error = %error,
                "failed to persist workflow run"
            );
        }
    }
}
