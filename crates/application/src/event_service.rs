use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tactic_core::{AppError, AppResult, EventId};
use tactic_domain::{EventDocument, EventPayload, EventValidator, FormFields};
use tracing::{info, warn};

use crate::autofill_service::AutofillService;
use crate::event_ports::{
    EventDocumentStore, EventHandler, EventMetadataRecord, EventMetadataStore,
    GenerativeTextService, HandledEvent,
};
use crate::pipeline_error::PipelineError;

/// Event handler that generates forms, runs autofill and persists documents.
///
/// The document write is primary. The metadata write that follows is best-effort:
/// when it fails the document stays persisted and only a warning is logged.
#[derive(Clone)]
pub struct EventService {
    documents: Arc<dyn EventDocumentStore>,
    metadata_store: Arc<dyn EventMetadataStore>,
    autofill: Option<AutofillService>,
    form_generator: Option<Arc<dyn GenerativeTextService>>,
}

impl EventService {
    /// Creates an event service without autofill or form generation.
    #[must_use]
    pub fn new(
        documents: Arc<dyn EventDocumentStore>,
        metadata_store: Arc<dyn EventMetadataStore>,
    ) -> Self {
        Self {
            documents,
            metadata_store,
            autofill: None,
            form_generator: None,
        }
    }

    /// Enables autofill of generated forms.
    #[must_use]
    pub fn with_autofill(mut self, autofill: AutofillService) -> Self {
        self.autofill = Some(autofill);
        self
    }

    /// Enables generative form design.
    #[must_use]
    pub fn with_form_generator(mut self, form_generator: Arc<dyn GenerativeTextService>) -> Self {
        self.form_generator = Some(form_generator);
        self
    }

    /// Loads one persisted event.
    pub async fn get_event(&self, event_id: EventId) -> AppResult<EventDocument> {
        self.documents
            .get(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event '{event_id}' does not exist")))
    }

    /// Deletes one persisted event.
    pub async fn delete_event(&self, event_id: EventId) -> AppResult<()> {
        if !self.documents.delete(event_id).await? {
            return Err(AppError::NotFound(format!(
                "event '{event_id}' does not exist"
            )));
        }

        info!(event_id = %event_id, "event deleted");
        Ok(())
    }

    async fn design_form(&self, payload: &EventPayload) -> AppResult<FormFields> {
        let Some(form_generator) = &self.form_generator else {
            return FormFields::default_contact_form();
        };

        match form_generator.generate_form_fields(payload).await {
            Ok(form) => {
                let report = EventValidator::new().validate_form_fields(&form);
                if report.is_valid() {
                    return Ok(form);
                }
                warn!(
                    errors = %report.error_messages().join("; "),
                    "generated form rejected, using default contact form"
                );
            }
            Err(error) => {
                warn!(
                    error = %PipelineError::GenerativeService(error),
                    "form generation failed, using default contact form"
                );
            }
        }

        FormFields::default_contact_form()
    }

    async fn write_metadata(
        &self,
        document: &EventDocument,
        autofill_applied: bool,
        is_new: bool,
    ) {
        let record = EventMetadataRecord {
            event_id: document.event_id(),
            event_type: document.event_type().as_str().to_owned(),
            title: document.title().to_owned(),
            status: document.status().to_owned(),
            autofill_applied,
            form_field_count: document.form_fields().fields.len(),
            created_at: document.created_at(),
            updated_at: document.updated_at(),
        };

        let result = if is_new {
            self.metadata_store.store_event_metadata(record).await
        } else {
            self.metadata_store.update_event_metadata(record).await
        };

        if let Err(error) = result {
            warn!(
                event_id = %document.event_id(),
                error = %PipelineError::SecondaryPersistence(error),
                "event document persisted without metadata"
            );
        }
    }
}

#[async_trait]
impl EventHandler for EventService {
    async fn create_event(&self, payload: EventPayload) -> AppResult<HandledEvent> {
        let event_id = EventId::new();
        let mut form_fields = self.design_form(&payload).await?;
        let mut autofill_applied = false;

        if let Some(autofill) = &self.autofill {
            let outcome = autofill.apply_autofill(&form_fields, &payload).await?;
            autofill_applied = outcome.autofill_applied;
            form_fields = outcome.form_fields;
        }

        let document = EventDocument::new(event_id, payload, form_fields, Utc::now())?;
        self.documents.store(document.clone()).await?;
        self.write_metadata(&document, autofill_applied, true).await;

        info!(event_id = %event_id, autofill_applied, "event created");
        Ok(HandledEvent {
            event_id,
            form_fields: document.form_fields().clone(),
            autofill_applied,
        })
    }

    async fn update_event(
        &self,
        event_id: EventId,
        patch: EventPayload,
    ) -> AppResult<HandledEvent> {
        let mut document = self.get_event(event_id).await?;
        document.apply_patch(&patch, Utc::now())?;

        let mut autofill_applied = false;
        if let Some(autofill) = &self.autofill {
            let outcome = autofill.apply_autofill_updates(document.form_fields(), &patch);
            autofill_applied = outcome.autofill_applied;
            document.set_form_fields(outcome.form_fields);
        }

        self.documents.update(document.clone()).await?;
        self.write_metadata(&document, autofill_applied, false).await;

        info!(event_id = %event_id, autofill_applied, "event updated");
        Ok(HandledEvent {
            event_id,
            form_fields: document.form_fields().clone(),
            autofill_applied,
        })
    }
}

#[cfg(test)]
mod tests;
