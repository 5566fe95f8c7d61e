use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use tactic_core::{AppError, AppResult};
use tactic_domain::{AutofillSource, EventPayload, EventType, FieldType, FormField, FormFields};

use crate::event_ports::GenerativeTextService;

use super::{AutofillCache, AutofillService, apply_rule_layer, majority_values};

struct FakeGenerativeTextService {
    suggestions: AppResult<Map<String, Value>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerativeTextService {
    fn suggesting(suggestions: Value) -> Self {
        Self {
            suggestions: Ok(suggestions.as_object().cloned().unwrap_or_default()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            suggestions: Err(AppError::Unavailable("provider offline".to_owned())),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerativeTextService for FakeGenerativeTextService {
    async fn correct_event(
        &self,
        _payload: &EventPayload,
        _errors: &[String],
    ) -> AppResult<EventPayload> {
        Err(AppError::Unavailable("not used".to_owned()))
    }

    async fn suggest_fields(&self, prompt: &str) -> AppResult<Map<String, Value>> {
        self.prompts.lock().await.push(prompt.to_owned());
        match &self.suggestions {
            Ok(suggestions) => Ok(suggestions.clone()),
            Err(error) => Err(AppError::Unavailable(error.to_string())),
        }
    }

    async fn generate_form_fields(&self, _payload: &EventPayload) -> AppResult<FormFields> {
        Err(AppError::Unavailable("not used".to_owned()))
    }
}

fn payload(value: Value) -> EventPayload {
    EventPayload::from_value(value).unwrap_or_else(|_| unreachable!())
}

fn field(name: &str, field_type: FieldType) -> FormField {
    FormField::new(name, field_type, name, false).unwrap_or_else(|_| unreachable!())
}

fn filled(name: &str, value: Value) -> FormField {
    let mut field = field(name, FieldType::Text);
    field.value = Some(value);
    field
}

fn contact_form() -> FormFields {
    FormFields::new(vec![
        field("email", FieldType::Email),
        field("phone", FieldType::Tel),
        field("venue", FieldType::Text),
        field("description", FieldType::Textarea),
    ])
}

#[tokio::test]
async fn rules_fill_mapped_contact_fields() {
    let service = AutofillService::new(Arc::new(AutofillCache::new()));
    let outcome = service
        .apply_autofill(
            &contact_form(),
            &payload(json!({
                "title": "DevConf",
                "event_type": "conference",
                "contact_email": "team@devconf.io",
                "location": "Hall A",
            })),
        )
        .await;

    assert!(outcome.is_ok());
    let outcome = outcome.unwrap_or_else(|_| unreachable!());
    assert!(outcome.autofill_applied);
    assert_eq!(
        outcome.form_fields.field("email").and_then(|field| field.value.clone()),
        Some(json!("team@devconf.io"))
    );
    assert_eq!(
        outcome.form_fields.field("venue").and_then(|field| field.autofill_source),
        Some(AutofillSource::Rules)
    );
    assert!(
        outcome
            .form_fields
            .field("phone")
            .is_some_and(|field| !field.has_value())
    );
}

#[tokio::test]
async fn rules_skip_fields_the_payload_already_carries() {
    let service = AutofillService::new(Arc::new(AutofillCache::new()));
    let outcome = service
        .apply_autofill(
            &contact_form(),
            &payload(json!({
                "title": "DevConf",
                "event_type": "conference",
                "email": "direct@devconf.io",
                "contact_email": "team@devconf.io",
            })),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(outcome.applied.iter().all(|fill| fill.field != "email"));
}

#[tokio::test]
async fn empty_form_is_rejected() {
    let service = AutofillService::new(Arc::new(AutofillCache::new()));
    let outcome = service
        .apply_autofill(&FormFields::default(), &payload(json!({"title": "x"})))
        .await;

    assert!(matches!(outcome, Err(AppError::Validation(message)) if message == "no form fields to autofill"));
}

#[tokio::test]
async fn generative_layer_fills_only_candidate_fields() {
    let generative = Arc::new(FakeGenerativeTextService::suggesting(json!({
        "description": "A day of talks",
        "venue": "should be ignored",
    })));
    let service =
        AutofillService::new(Arc::new(AutofillCache::new())).with_generative(generative.clone());

    let outcome = service
        .apply_autofill(
            &contact_form(),
            &payload(json!({"title": "DevConf", "event_type": "conference"})),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(generative.prompts.lock().await.len(), 1);
    assert_eq!(
        outcome
            .form_fields
            .field("description")
            .and_then(|field| field.autofill_source),
        Some(AutofillSource::Ai)
    );
    assert!(
        outcome
            .form_fields
            .field("venue")
            .is_some_and(|field| !field.has_value())
    );
}

#[tokio::test]
async fn generative_failures_are_skipped() {
    let service = AutofillService::new(Arc::new(AutofillCache::new()))
        .with_generative(Arc::new(FakeGenerativeTextService::failing()));

    let outcome = service
        .apply_autofill(
            &contact_form(),
            &payload(json!({"title": "DevConf", "event_type": "conference"})),
        )
        .await;

    assert!(outcome.is_ok());
    assert!(!outcome.unwrap_or_else(|_| unreachable!()).autofill_applied);
}

#[tokio::test]
async fn cache_layer_applies_majority_value_from_similar_events() {
    let cache = Arc::new(AutofillCache::new());
    for (index, venue) in ["Hall A", "Hall B", "Hall A", "Hall B", "Hall A"]
        .iter()
        .enumerate()
    {
        cache
            .insert(
                format!("workshop_past {index}"),
                payload(json!({"title": format!("past {index}"), "event_type": "workshop"})),
                FormFields::new(vec![filled("venue", json!(venue))]),
            )
            .await;
    }
    cache
        .insert(
            "meeting_other".to_owned(),
            payload(json!({"title": "other", "event_type": "meeting"})),
            FormFields::new(vec![filled("venue", json!("Room 9"))]),
        )
        .await;

    let service = AutofillService::new(cache.clone());
    let outcome = service
        .apply_autofill(
            &FormFields::new(vec![field("venue", FieldType::Text)]),
            &payload(json!({"title": "Rust 101", "event_type": "workshop"})),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let venue = outcome.form_fields.field("venue");
    assert_eq!(venue.and_then(|field| field.value.clone()), Some(json!("Hall A")));
    assert_eq!(
        venue.and_then(|field| field.autofill_source),
        Some(AutofillSource::Cache)
    );
    assert!(cache.contains("workshop_Rust 101").await);
}

#[test]
fn majority_requires_sixty_percent_of_non_empty_samples() {
    let forms = |values: &[Value]| -> Vec<FormFields> {
        values
            .iter()
            .map(|value| FormFields::new(vec![filled("venue", value.clone())]))
            .collect()
    };

    let below = majority_values(&forms(&[
        json!("Hall A"),
        json!("Hall A"),
        json!("Hall B"),
        json!("Hall B"),
        json!("Hall C"),
    ]));
    assert!(below.is_empty());

    let at_threshold = majority_values(&forms(&[
        json!("Hall A"),
        json!("Hall B"),
        json!("Hall A"),
        json!(""),
        json!("Hall A"),
        json!("Hall B"),
    ]));
    assert_eq!(at_threshold, vec![("venue".to_owned(), json!("Hall A"))]);
}

#[test]
fn majority_tie_goes_to_first_seen_value() {
    let forms: Vec<FormFields> = [json!(1), json!(2)]
        .into_iter()
        .map(|value| FormFields::new(vec![filled("rooms", value)]))
        .collect();

    let winners = majority_values(&forms);
    assert!(winners.is_empty());

    let single = majority_values(&forms[..1]);
    assert_eq!(single, vec![("rooms".to_owned(), json!(1))]);
}

#[tokio::test]
async fn overflowing_insert_evicts_a_batch_of_twenty() {
    let cache = AutofillCache::new();
    for index in 0..100 {
        cache
            .insert(
                format!("general_{index}"),
                EventPayload::new(),
                FormFields::default(),
            )
            .await;
    }
    assert_eq!(cache.len().await, 100);

    cache
        .insert("general_overflow".to_owned(), EventPayload::new(), FormFields::default())
        .await;
    assert_eq!(cache.len().await, 81);
    assert!(!cache.contains("general_0").await);
    assert!(!cache.contains("general_19").await);
    assert!(cache.contains("general_20").await);
    assert!(cache.contains("general_overflow").await);
}

#[tokio::test]
async fn sampled_entries_refresh_recency() {
    let cache = AutofillCache::with_limits(3, 1);
    let form = FormFields::new(vec![filled("venue", json!("Hall A"))]);
    for (key, event_type) in [("a", "conference"), ("b", "meeting"), ("c", "meeting")] {
        cache
            .insert(
                key.to_owned(),
                payload(json!({"event_type": event_type})),
                form.clone(),
            )
            .await;
    }

    let sampled = cache.recent_similar(&EventType::Conference, 5).await;
    assert_eq!(sampled.len(), 1);

    cache
        .insert("d".to_owned(), EventPayload::new(), form.clone())
        .await;
    assert!(cache.contains("a").await);
    assert!(!cache.contains("b").await);
}

#[test]
fn incremental_updates_fill_dependents_without_overwriting_manual_values() {
    let service = AutofillService::new(Arc::new(AutofillCache::new()));
    let mut summary = filled("summary", json!("typed by organizer"));
    summary.autofilled = false;
    let mut description = filled("description", json!("old generated text"));
    description.autofilled = true;
    let form = FormFields::new(vec![
        description,
        summary,
        field("address", FieldType::Text),
        field("amenities", FieldType::Text),
    ]);

    let outcome = service.apply_autofill_updates(
        &form,
        &payload(json!({"title": "Launch Night", "venue": "Pier 7", "category": ""})),
    );

    assert_eq!(
        outcome
            .form_fields
            .field("description")
            .and_then(|field| field.value.clone()),
        Some(json!("Description for Launch Night"))
    );
    assert_eq!(
        outcome
            .form_fields
            .field("summary")
            .and_then(|field| field.value.clone()),
        Some(json!("typed by organizer"))
    );
    assert_eq!(
        outcome
            .form_fields
            .field("address")
            .and_then(|field| field.autofill_source),
        Some(AutofillSource::Incremental)
    );
    assert!(
        outcome
            .form_fields
            .field("amenities")
            .is_some_and(|field| !field.has_value())
    );
}

proptest! {
    #[test]
    fn rule_layer_is_idempotent(
        contact_email in proptest::option::of("[a-z]{1,6}@example\\.com"),
        contact_phone in proptest::option::of("\\+1[0-9]{10}"),
        location in proptest::option::of("[A-Z][a-z]{2,8}"),
        payload_has_email in any::<bool>(),
    ) {
        let mut event = EventPayload::new();
        if let Some(value) = contact_email {
            event.insert("contact_email", json!(value));
        }
        if let Some(value) = contact_phone {
            event.insert("contact_phone", json!(value));
        }
        if let Some(value) = location {
            event.insert("location", json!(value));
        }
        if payload_has_email {
            event.insert("email", json!("direct@example.com"));
        }

        let mut once = contact_form();
        apply_rule_layer(&mut once, &event);
        let mut twice = once.clone();
        let second_pass = apply_rule_layer(&mut twice, &event);

        prop_assert!(second_pass.is_empty());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn cache_never_exceeds_capacity(inserts in 0_usize..260) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let size = runtime.block_on(async {
            let cache = AutofillCache::new();
            for index in 0..inserts {
                cache
                    .insert(format!("general_{index}"), EventPayload::new(), FormFields::default())
                    .await;
                if cache.len().await > AutofillCache::DEFAULT_CAPACITY {
                    return usize::MAX;
                }
            }
            cache.len().await
        });

        prop_assert!(size <= AutofillCache::DEFAULT_CAPACITY);
    }
}
