use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};
use tactic_domain::{EventPayload, ValidationReport};
use tracing::{info, warn};

use super::FallbackService;
use super::templates::DEFAULT_TITLE;
use crate::event_ports::{CorrectionMethod, FallbackStatus};

/// `(alternate key, canonical key)` pairs recognized in loose payloads.
const FIELD_NAME_MAPPINGS: [(&str, &str); 5] = [
    ("name", "title"),
    ("event_name", "title"),
    ("type", "event_type"),
    ("desc", "description"),
    ("details", "description"),
];

const NUMERIC_FIELDS: [&str; 3] = ["capacity", "duration", "price"];

/// Result of standalone fallback processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Whether the processed payload validates.
    pub success: bool,
    /// Processed payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_payload: Option<EventPayload>,
    /// Whether processing changed the payload.
    pub fallback_applied: bool,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Remaining validation errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

impl ProcessOutcome {
    fn succeeded(original: &EventPayload, processed: EventPayload) -> Self {
        Self {
            success: true,
            fallback_applied: &processed != original,
            processed_payload: Some(processed),
            error: None,
            validation_errors: Vec::new(),
        }
    }

    fn failed(error: impl Into<String>, validation_errors: Vec<String>) -> Self {
        Self {
            success: false,
            processed_payload: None,
            fallback_applied: false,
            error: Some(error.into()),
            validation_errors,
        }
    }
}

impl FallbackService {
    /// Normalizes a loose payload into one that validates, without any external
    /// collaborator.
    pub async fn process_event(&self, payload: &EventPayload) -> ProcessOutcome {
        let mut processed = apply_fallback_rules(payload);

        let first_pass = match self.validator.validate(&processed).await {
            Ok(report) => report,
            Err(error) => return self.process_failed(payload, error.to_string(), Vec::new()).await,
        };
        if first_pass.is_valid() {
            return self.process_succeeded(payload, processed, &first_pass).await;
        }

        map_field_names(payload, &mut processed);
        coerce_numeric_fields(&mut processed);
        inject_defaults(&mut processed);

        match self.validator.validate(&processed).await {
            Ok(report) if report.is_valid() => {
                self.process_succeeded(payload, processed, &first_pass).await
            }
            Ok(report) => {
                self.process_failed(
                    payload,
                    "Payload still invalid after fallback processing".to_owned(),
                    report.error_messages(),
                )
                .await
            }
            Err(error) => self.process_failed(payload, error.to_string(), Vec::new()).await,
        }
    }

    async fn process_succeeded(
        &self,
        original: &EventPayload,
        processed: EventPayload,
        first_pass: &ValidationReport,
    ) -> ProcessOutcome {
        info!("fallback processing produced a valid payload");
        self.record_result(
            original,
            Some(processed.clone()),
            FallbackStatus::Success,
            CorrectionMethod::Rules,
            &first_pass.error_messages(),
        )
        .await;
        ProcessOutcome::succeeded(original, processed)
    }

    async fn process_failed(
        &self,
        original: &EventPayload,
        error: String,
        validation_errors: Vec<String>,
    ) -> ProcessOutcome {
        warn!(error = %error, "fallback processing failed");
        self.record_result(
            original,
            None,
            FallbackStatus::Failed,
            CorrectionMethod::None,
            &validation_errors,
        )
        .await;
        ProcessOutcome::failed(error, validation_errors)
    }
}

fn apply_fallback_rules(payload: &EventPayload) -> EventPayload {
    let mut processed = payload.clone();
    if !processed.has_value("title") {
        processed.insert("title", json!(DEFAULT_TITLE));
    }
    if !processed.has_value("event_type") {
        processed.insert("event_type", json!("general"));
    }
    if processed
        .get("email")
        .and_then(Value::as_str)
        .is_some_and(|email| !email.contains('@'))
    {
        processed.remove("email");
    }
    processed
}

/// Copies alternate keys onto canonical keys the caller did not supply.
fn map_field_names(original: &EventPayload, processed: &mut EventPayload) {
    for (alternate, canonical) in FIELD_NAME_MAPPINGS {
        if original.has_value(canonical) {
            continue;
        }
        if let Some(value) = original.get_non_empty(alternate) {
            processed.insert(canonical, value.clone());
        }
    }
}

fn coerce_numeric_fields(processed: &mut EventPayload) {
    for field in NUMERIC_FIELDS {
        let Some(text) = processed.get(field).and_then(Value::as_str) else {
            continue;
        };
        let text = text.trim();

        let coerced = text.parse::<i64>().map(Value::from).ok().or_else(|| {
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        });
        if let Some(value) = coerced {
            processed.insert(field, value);
        }
    }
}

fn inject_defaults(processed: &mut EventPayload) {
    let defaults = [
        ("title", json!(DEFAULT_TITLE)),
        ("event_type", json!("general")),
        ("description", json!("")),
        ("status", json!("draft")),
    ];
    for (field, default) in defaults {
        if !processed.has_value(field) {
            processed.insert(field, default);
        }
    }
}
