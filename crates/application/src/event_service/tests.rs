use std::sync::Arc;

use serde_json::json;

use tactic_core::{AppError, EventId};
use tactic_domain::{AutofillSource, FieldType, FormField, FormFields};

use crate::autofill_service::{AutofillCache, AutofillService};
use crate::event_ports::EventHandler;
use crate::test_support::{
    FakeDocumentStore, RecordingMetadataStore, StubGenerativeTextService, payload,
};

use super::EventService;

fn autofilling_service(
    documents: Arc<FakeDocumentStore>,
    metadata: Arc<RecordingMetadataStore>,
) -> EventService {
    EventService::new(documents, metadata)
        .with_autofill(AutofillService::new(Arc::new(AutofillCache::new())))
}

#[tokio::test]
async fn create_event_persists_document_then_metadata() {
    let documents = Arc::new(FakeDocumentStore::default());
    let metadata = Arc::new(RecordingMetadataStore::default());
    let service = autofilling_service(documents.clone(), metadata.clone());

    let handled = service
        .create_event(payload(json!({
            "title": "Design Sprint",
            "event_type": "workshop",
            "contact_email": "host@example.com",
        })))
        .await;

    assert!(handled.is_ok());
    let handled = handled.unwrap_or_else(|_| unreachable!());
    assert!(handled.autofill_applied);
    assert_eq!(
        handled
            .form_fields
            .field("email")
            .and_then(|field| field.autofill_source),
        Some(AutofillSource::Rules)
    );

    let stored = documents.documents.lock().await;
    let document = stored.get(&handled.event_id);
    assert!(document.is_some_and(|document| document.title() == "Design Sprint"));

    let records = metadata.event_records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, "workshop");
    assert!(records[0].autofill_applied);
    assert_eq!(records[0].form_field_count, 3);
}

#[tokio::test]
async fn metadata_failure_keeps_the_document() {
    let documents = Arc::new(FakeDocumentStore::default());
    let service = EventService::new(documents.clone(), Arc::new(RecordingMetadataStore::failing()));

    let handled = service
        .create_event(payload(json!({"title": "Town hall", "event_type": "meeting"})))
        .await;

    assert!(handled.is_ok());
    assert_eq!(documents.documents.lock().await.len(), 1);
}

#[tokio::test]
async fn document_failure_is_an_error() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let service = EventService::new(Arc::new(FakeDocumentStore::failing()), metadata.clone());

    let handled = service
        .create_event(payload(json!({"title": "Town hall", "event_type": "meeting"})))
        .await;

    assert!(matches!(handled, Err(AppError::Internal(_))));
    assert!(metadata.event_records.lock().await.is_empty());
}

#[tokio::test]
async fn invalid_generated_form_falls_back_to_contact_form() {
    let generator = Arc::new(StubGenerativeTextService {
        form: Some(FormFields::new(vec![
            FormField::new("tier", FieldType::Select, "Tier", true)
                .unwrap_or_else(|_| unreachable!()),
        ])),
        ..StubGenerativeTextService::default()
    });
    let service = EventService::new(
        Arc::new(FakeDocumentStore::default()),
        Arc::new(RecordingMetadataStore::default()),
    )
    .with_form_generator(generator);

    let handled = service
        .create_event(payload(json!({"title": "Town hall", "event_type": "meeting"})))
        .await
        .unwrap_or_else(|_| unreachable!());

    let names: Vec<&str> = handled
        .form_fields
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(names, vec!["name", "email", "phone"]);
}

#[tokio::test]
async fn valid_generated_form_is_used() {
    let mut tier = FormField::new("tier", FieldType::Select, "Tier", true)
        .unwrap_or_else(|_| unreachable!());
    tier.options = vec![json!("standard"), json!("vip")];
    let generator = Arc::new(StubGenerativeTextService {
        form: Some(FormFields::new(vec![tier])),
        ..StubGenerativeTextService::default()
    });
    let service = EventService::new(
        Arc::new(FakeDocumentStore::default()),
        Arc::new(RecordingMetadataStore::default()),
    )
    .with_form_generator(generator);

    let handled = service
        .create_event(payload(json!({"title": "Gala", "event_type": "general"})))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(handled.form_fields.field("tier").is_some());
}

#[tokio::test]
async fn update_event_merges_patch_and_refreshes_dependents() {
    let documents = Arc::new(FakeDocumentStore::default());
    let metadata = Arc::new(RecordingMetadataStore::default());
    let service = autofilling_service(documents.clone(), metadata.clone());
    let generator = Arc::new(StubGenerativeTextService {
        form: Some(FormFields::new(vec![
            FormField::new("summary", FieldType::Textarea, "Summary", false)
                .unwrap_or_else(|_| unreachable!()),
        ])),
        ..StubGenerativeTextService::default()
    });
    let service = service.with_form_generator(generator);

    let created = service
        .create_event(payload(json!({"title": "Town hall", "event_type": "meeting"})))
        .await
        .unwrap_or_else(|_| unreachable!());

    let updated = service
        .update_event(created.event_id, payload(json!({"title": "Town hall Q3"})))
        .await;

    assert!(updated.is_ok());
    let updated = updated.unwrap_or_else(|_| unreachable!());
    assert_eq!(
        updated
            .form_fields
            .field("summary")
            .and_then(|field| field.value.clone()),
        Some(json!("Summary of Town hall Q3"))
    );

    let stored = service.get_event(created.event_id).await;
    assert!(stored.is_ok_and(|document| document.title() == "Town hall Q3"
        && document.updated_at().is_some()));
    assert_eq!(metadata.event_records.lock().await.len(), 2);
}

#[tokio::test]
async fn update_of_unknown_event_is_not_found() {
    let service = EventService::new(
        Arc::new(FakeDocumentStore::default()),
        Arc::new(RecordingMetadataStore::default()),
    );

    let updated = service
        .update_event(EventId::new(), payload(json!({"title": "x"})))
        .await;
    assert!(matches!(updated, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_event_removes_the_document() {
    let documents = Arc::new(FakeDocumentStore::default());
    let service = EventService::new(documents.clone(), Arc::new(RecordingMetadataStore::default()));

    let created = service
        .create_event(payload(json!({"title": "Town hall", "event_type": "meeting"})))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(service.delete_event(created.event_id).await.is_ok());
    assert!(documents.documents.lock().await.is_empty());
    assert!(matches!(
        service.delete_event(created.event_id).await,
        Err(AppError::NotFound(_))
    ));
}
