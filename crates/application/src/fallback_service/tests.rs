use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};

use tactic_domain::{EventPayload, EventValidator, ValidationCode, ValidationIssue};

use crate::event_ports::{CorrectionMethod, FallbackStatus};
use crate::test_support::{RecordingMetadataStore, StubGenerativeTextService, payload};

use super::FallbackService;

fn service(metadata: Arc<RecordingMetadataStore>) -> FallbackService {
    FallbackService::new(Arc::new(EventValidator::new()), metadata)
}

fn errors_for(payload: &EventPayload) -> Vec<ValidationIssue> {
    EventValidator::new().validate(payload).errors
}

#[tokio::test]
async fn conference_without_title_is_fixed_by_rules() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let invalid = payload(json!({"event_type": "conference"}));

    let outcome = service(metadata.clone())
        .handle_invalid_event(&invalid, &errors_for(&invalid))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.correction_method, CorrectionMethod::Rules);
    assert_eq!(
        outcome
            .corrected_payload
            .as_ref()
            .and_then(EventPayload::title),
        Some("Untitled Event")
    );
    assert_eq!(
        outcome.original_errors,
        vec!["Missing required field: title".to_owned()]
    );

    let fallbacks = metadata.fallbacks.lock().await;
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].status, FallbackStatus::Success);
    assert_eq!(fallbacks[0].correction_method, CorrectionMethod::Rules);
}

#[tokio::test]
async fn generative_correction_runs_first_when_configured() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let generative = StubGenerativeTextService::correcting_to(payload(json!({
        "title": "DevConf 2026",
        "event_type": "conference",
    })));
    let fallback = service(metadata).with_generative(generative.clone());
    assert_eq!(
        fallback.strategy_methods(),
        vec![
            CorrectionMethod::Ai,
            CorrectionMethod::Rules,
            CorrectionMethod::Template
        ]
    );

    let invalid = payload(json!({"event_type": "conference"}));
    let outcome = fallback
        .handle_invalid_event(&invalid, &errors_for(&invalid))
        .await;

    assert_eq!(outcome.correction_method, CorrectionMethod::Ai);
    assert_eq!(
        generative.correction_calls.lock().await.first().cloned(),
        Some(vec!["Missing required field: title".to_owned()])
    );
}

#[tokio::test]
async fn generative_failure_falls_through_to_rules() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let fallback =
        service(metadata).with_generative(Arc::new(StubGenerativeTextService::default()));

    let invalid = payload(json!({"event_type": "conference"}));
    let outcome = fallback
        .handle_invalid_event(&invalid, &errors_for(&invalid))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.correction_method, CorrectionMethod::Rules);
}

#[tokio::test]
async fn template_covers_errors_without_a_field() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let invalid = payload(json!({"event_type": "meeting", "venue": "Room 2"}));

    let outcome = service(metadata)
        .handle_invalid_event(
            &invalid,
            &[ValidationIssue::from_message("Something odd happened")],
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.correction_method, CorrectionMethod::Template);
    let corrected = outcome.corrected_payload.unwrap_or_default();
    assert_eq!(corrected.title(), Some("Meeting"));
    assert_eq!(corrected.get("venue"), Some(&json!("Room 2")));
}

#[tokio::test]
async fn exhausted_cascade_reports_failure_and_persists_it() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let invalid = payload(json!({"event_type": "hackathon", "email": "nobody"}));

    let outcome = service(metadata.clone())
        .handle_invalid_event(&invalid, &errors_for(&invalid))
        .await;

    assert!(!outcome.success);
    assert!(outcome.corrected_payload.is_none());
    assert_eq!(outcome.correction_method, CorrectionMethod::None);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Unable to correct validation errors")
    );
    assert_eq!(outcome.original_errors.len(), 2);

    let fallbacks = metadata.fallbacks.lock().await;
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].status, FallbackStatus::Failed);
    assert_eq!(fallbacks[0].correction_method, CorrectionMethod::None);
}

#[tokio::test]
async fn metadata_failures_do_not_change_the_outcome() {
    let metadata = Arc::new(RecordingMetadataStore::failing());
    let invalid = payload(json!({"event_type": "conference"}));

    let outcome = service(metadata)
        .handle_invalid_event(&invalid, &errors_for(&invalid))
        .await;

    assert!(outcome.success);
}

#[tokio::test]
async fn process_event_maps_names_and_coerces_numbers() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let outcome = service(metadata.clone())
        .process_event(&payload(json!({
            "name": "Gala",
            "capacity": "50",
            "email": "not-an-email",
        })))
        .await;

    assert!(outcome.success);
    assert!(outcome.fallback_applied);
    let processed = outcome.processed_payload.unwrap_or_default();
    assert_eq!(processed.title(), Some("Gala"));
    assert_eq!(processed.get("capacity"), Some(&json!(50)));
    assert_eq!(processed.str_field("status"), Some("draft"));
    assert!(!processed.contains_key("email"));

    let fallbacks = metadata.fallbacks.lock().await;
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].correction_method, CorrectionMethod::Rules);
}

#[tokio::test]
async fn process_event_reports_remaining_errors() {
    let metadata = Arc::new(RecordingMetadataStore::default());
    let outcome = service(metadata.clone())
        .process_event(&payload(json!({
            "title": "Board review",
            "event_type": "meeting",
            "status": "archived",
        })))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.validation_errors.len(), 1);
    assert!(outcome.validation_errors[0].contains("status"));

    let fallbacks = metadata.fallbacks.lock().await;
    assert_eq!(fallbacks[0].status, FallbackStatus::Failed);
    assert_eq!(fallbacks[0].correction_method, CorrectionMethod::None);
}

fn loose_payload() -> impl Strategy<Value = EventPayload> {
    (
        proptest::option::of(prop_oneof![Just(json!("")), Just(json!("Ab")), Just(json!("Quarterly planning"))]),
        proptest::option::of(prop_oneof![Just(json!("conference")), Just(json!("workshop")), Just(json!("retreat"))]),
        proptest::option::of(prop_oneof![Just(json!("draft")), Just(json!("archived"))]),
        proptest::option::of(prop_oneof![Just(json!(0)), Just(json!("12")), Just(json!(250))]),
        proptest::option::of(prop_oneof![Just(json!("2026-13-45")), Just(json!("2031-03-01T10:00:00"))]),
    )
        .prop_map(|(title, event_type, status, capacity, date)| {
            let mut event = EventPayload::new();
            for (key, value) in [
                ("title", title),
                ("event_type", event_type),
                ("status", status),
                ("capacity", capacity),
                ("date", date),
            ] {
                if let Some(value) = value {
                    event.insert(key, value);
                }
            }
            event
        })
}

proptest! {
    #[test]
    fn successful_corrections_always_revalidate(invalid in loose_payload()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let errors = errors_for(&invalid);
        prop_assume!(!errors.is_empty());

        let outcome = runtime.block_on(async {
            service(Arc::new(RecordingMetadataStore::default()))
                .handle_invalid_event(&invalid, &errors)
                .await
        });

        if outcome.success {
            let corrected = outcome.corrected_payload.unwrap_or_default();
            prop_assert!(EventValidator::new().validate(&corrected).is_valid());
            prop_assert_ne!(outcome.correction_method, CorrectionMethod::None);
        } else {
            prop_assert_eq!(outcome.correction_method, CorrectionMethod::None);
        }
    }
}

#[test]
fn rule_corrections_leave_unrelated_keys_alone() {
    let invalid = payload(json!({"event_type": "seminar", "utm_source": "newsletter"}));
    let corrected = super::strategies::apply_correction_rules(&invalid, &errors_for(&invalid));
    assert_eq!(corrected.get("utm_source"), Some(&Value::from("newsletter")));
    assert_eq!(corrected.title(), Some("Untitled Event"));
}

#[test]
fn out_of_range_numbers_fall_back_to_defaults() {
    let invalid = payload(json!({
        "title": "Launch",
        "event_type": "conference",
        "capacity": "1e30",
        "duration": 1e30,
    }));
    let errors = [
        ValidationIssue::new(ValidationCode::InvalidType, "capacity", "Capacity must be an integer"),
        ValidationIssue::new(ValidationCode::InvalidType, "duration", "Duration must be an integer"),
    ];

    let corrected = super::strategies::apply_correction_rules(&invalid, &errors);

    assert_eq!(corrected.get("capacity"), Some(&json!(100)));
    assert_eq!(corrected.get("duration"), Some(&json!(2)));
}

#[test]
fn whole_numbers_in_text_are_coerced() {
    let invalid = payload(json!({"title": "Launch", "event_type": "meeting", "capacity": " 25.0 "}));
    let errors = [ValidationIssue::new(
        ValidationCode::InvalidType,
        "capacity",
        "Capacity must be an integer",
    )];

    let corrected = super::strategies::apply_correction_rules(&invalid, &errors);

    assert_eq!(corrected.get("capacity"), Some(&json!(25)));
}
