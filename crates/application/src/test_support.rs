use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use tactic_core::{AppError, AppResult, EventId};
use tactic_domain::{EventDocument, EventPayload, FormFields};

use crate::event_ports::{
    BatchRun, DependencyKind, EventDocumentStore, EventMetadataRecord, EventMetadataStore,
    EventSideEffects, FallbackResult, GenerativeTextService, WorkflowRun,
};

pub(crate) fn payload(value: Value) -> EventPayload {
    EventPayload::from_value(value).unwrap_or_else(|_| unreachable!())
}

#[derive(Default)]
pub(crate) struct RecordingMetadataStore {
    pub(crate) fail_writes: bool,
    pub(crate) event_records: Mutex<Vec<EventMetadataRecord>>,
    pub(crate) workflow_runs: Mutex<Vec<WorkflowRun>>,
    pub(crate) batches: Mutex<Vec<BatchRun>>,
    pub(crate) fallbacks: Mutex<Vec<FallbackResult>>,
}

impl RecordingMetadataStore {
    pub(crate) fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check(&self) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("metadata store offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventMetadataStore for RecordingMetadataStore {
    async fn store_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()> {
        self.check()?;
        self.event_records.lock().await.push(record);
        Ok(())
    }

    async fn update_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()> {
        self.check()?;
        self.event_records.lock().await.push(record);
        Ok(())
    }

    async fn store_workflow_result(&self, run: &WorkflowRun) -> AppResult<()> {
        self.check()?;
        self.workflow_runs.lock().await.push(run.clone());
        Ok(())
    }

    async fn store_batch_result(&self, batch: &BatchRun) -> AppResult<()> {
        self.check()?;
        self.batches.lock().await.push(batch.clone());
        Ok(())
    }

    async fn store_fallback_result(&self, result: &FallbackResult) -> AppResult<()> {
        self.check()?;
        self.fallbacks.lock().await.push(result.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeDocumentStore {
    pub(crate) fail_writes: bool,
    pub(crate) documents: Mutex<HashMap<EventId, EventDocument>>,
}

impl FakeDocumentStore {
    pub(crate) fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventDocumentStore for FakeDocumentStore {
    async fn store(&self, document: EventDocument) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("document store offline".to_owned()));
        }
        self.documents
            .lock()
            .await
            .insert(document.event_id(), document);
        Ok(())
    }

    async fn get(&self, event_id: EventId) -> AppResult<Option<EventDocument>> {
        Ok(self.documents.lock().await.get(&event_id).cloned())
    }

    async fn update(&self, document: EventDocument) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("document store offline".to_owned()));
        }
        let mut documents = self.documents.lock().await;
        if !documents.contains_key(&document.event_id()) {
            return Err(AppError::NotFound(format!(
                "event '{}' does not exist",
                document.event_id()
            )));
        }
        documents.insert(document.event_id(), document);
        Ok(())
    }

    async fn delete(&self, event_id: EventId) -> AppResult<bool> {
        Ok(self.documents.lock().await.remove(&event_id).is_some())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSideEffects {
    pub(crate) fail: bool,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl RecordingSideEffects {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    async fn record(&self, call: String) -> AppResult<()> {
        self.calls.lock().await.push(call);
        if self.fail {
            return Err(AppError::Unavailable("downstream offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventSideEffects for RecordingSideEffects {
    async fn update_related_events(
        &self,
        event_id: EventId,
        _payload: &EventPayload,
    ) -> AppResult<()> {
        self.record(format!("related:{event_id}")).await
    }

    async fn send_creation_notifications(
        &self,
        event_id: EventId,
        _payload: &EventPayload,
    ) -> AppResult<()> {
        self.record(format!("notify:{event_id}")).await
    }

    async fn update_analytics(&self, event_id: EventId, _payload: &EventPayload) -> AppResult<()> {
        self.record(format!("analytics:{event_id}")).await
    }

    async fn propagate_dependency(
        &self,
        _event_id: EventId,
        kind: DependencyKind,
        _value: &Value,
    ) -> AppResult<()> {
        self.record(format!("dependency:{}", kind.as_str())).await
    }
}

/// Generative provider returning canned answers.
#[derive(Default)]
pub(crate) struct StubGenerativeTextService {
    pub(crate) correction: Option<EventPayload>,
    pub(crate) form: Option<FormFields>,
    pub(crate) correction_calls: Mutex<Vec<Vec<String>>>,
}

impl StubGenerativeTextService {
    pub(crate) fn correcting_to(correction: EventPayload) -> Arc<Self> {
        Arc::new(Self {
            correction: Some(correction),
            ..Self::default()
        })
    }
}

#[async_trait]
impl GenerativeTextService for StubGenerativeTextService {
    async fn correct_event(
        &self,
        _payload: &EventPayload,
        errors: &[String],
    ) -> AppResult<EventPayload> {
        self.correction_calls.lock().await.push(errors.to_vec());
        self.correction
            .clone()
            .ok_or_else(|| AppError::Unavailable("generative provider offline".to_owned()))
    }

    async fn suggest_fields(&self, _prompt: &str) -> AppResult<Map<String, Value>> {
        Err(AppError::Unavailable("generative provider offline".to_owned()))
    }

    async fn generate_form_fields(&self, _payload: &EventPayload) -> AppResult<FormFields> {
        self.form
            .clone()
            .ok_or_else(|| AppError::Unavailable("generative provider offline".to_owned()))
    }
}
