use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Number, Value};
use tactic_core::{AppError, AppResult};
use tactic_domain::{
    EventPayload, ValidationCode, ValidationIssue, extract_field_name, is_empty_value,
    is_sensitive_metadata_key, parse_event_date,
};

use super::CorrectionStrategy;
use super::templates::{event_template, missing_field_default, valid_field_default};
use crate::event_ports::{CorrectionMethod, GenerativeTextService};
use crate::pipeline_error::PipelineError;

const TITLE_MAX_LENGTH: usize = 200;
const DESCRIPTION_MAX_LENGTH: usize = 2000;

/// Asks the generative-text provider to repair the payload.
pub struct GenerativeCorrection {
    generative: Arc<dyn GenerativeTextService>,
}

impl GenerativeCorrection {
    /// Creates the strategy.
    #[must_use]
    pub fn new(generative: Arc<dyn GenerativeTextService>) -> Self {
        Self { generative }
    }
}

#[async_trait]
impl CorrectionStrategy for GenerativeCorrection {
    fn method(&self) -> CorrectionMethod {
        CorrectionMethod::Ai
    }

    async fn correct(
        &self,
        payload: &EventPayload,
        errors: &[ValidationIssue],
    ) -> AppResult<EventPayload> {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        self.generative
            .correct_event(payload, &messages)
            .await
            .map_err(|error| {
                AppError::Unavailable(PipelineError::GenerativeService(error).to_string())
            })
    }
}

/// Deterministic per-error repairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedCorrection;

#[async_trait]
impl CorrectionStrategy for RuleBasedCorrection {
    fn method(&self) -> CorrectionMethod {
        CorrectionMethod::Rules
    }

    async fn correct(
        &self,
        payload: &EventPayload,
        errors: &[ValidationIssue],
    ) -> AppResult<EventPayload> {
        Ok(apply_correction_rules(payload, errors))
    }
}

/// Applies one repair per error. Errors that name no field are skipped.
pub(crate) fn apply_correction_rules(
    payload: &EventPayload,
    errors: &[ValidationIssue],
) -> EventPayload {
    let mut corrected = payload.clone();

    for issue in errors {
        let Some(field) = issue
            .field
            .clone()
            .or_else(|| extract_field_name(issue.message.as_str()))
        else {
            continue;
        };
        let field = field.as_str();
        let current = corrected.get(field).cloned();

        match issue.code {
            ValidationCode::MissingRequired => {
                corrected.insert(field, missing_field_default(field));
            }
            ValidationCode::InvalidFormat => {
                if let Some(fixed) = current.as_ref().and_then(|value| fix_format(field, value)) {
                    corrected.insert(field, fixed);
                }
            }
            ValidationCode::InvalidValue | ValidationCode::TooShort => {
                corrected.insert(field, valid_field_default(field));
            }
            ValidationCode::TooLong => {
                let fixed = current
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(|text| Value::String(truncate(field, text)))
                    .unwrap_or_else(|| valid_field_default(field));
                corrected.insert(field, fixed);
            }
            ValidationCode::InvalidType => {
                let fixed = current
                    .as_ref()
                    .and_then(|value| coerce_type(field, value))
                    .unwrap_or_else(|| valid_field_default(field));
                corrected.insert(field, fixed);
            }
            ValidationCode::SensitiveData => {
                if let Some(Value::Object(metadata)) = current {
                    let cleaned = metadata
                        .into_iter()
                        .filter(|(key, _)| !is_sensitive_metadata_key(key))
                        .collect();
                    corrected.insert(field, Value::Object(cleaned));
                }
            }
            ValidationCode::Warning | ValidationCode::Unclassified => {}
        }
    }

    corrected
}

fn fix_format(field: &str, value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    match field {
        "email" => Some(Value::String(text.trim().to_lowercase())),
        "phone" => Some(Value::String(
            text.chars().filter(char::is_ascii_digit).collect(),
        )),
        "date" => Some(
            parse_event_date(text)
                .map(|date| Value::String(date.to_rfc3339()))
                .unwrap_or(Value::Null),
        ),
        _ => None,
    }
}

fn coerce_type(field: &str, value: &Value) -> Option<Value> {
    match field {
        "capacity" | "duration" => whole_number(value).map(Value::from),
        "price" => value
            .as_str()?
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "title" | "description" | "event_type" | "status" => match value {
            Value::Number(number) => Some(Value::String(number.to_string())),
            Value::Bool(flag) => Some(Value::String(flag.to_string())),
            _ => None,
        },
        _ => None,
    }
}

fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(integral_f64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

/// Converts a whole float inside the `i64` range; anything else is rejected.
fn integral_f64(number: f64) -> Option<i64> {
    // 2^63 is exact in f64; `i64::MAX as f64` would round up to it.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    (number.is_finite() && number.fract() == 0.0 && (-BOUND..BOUND).contains(&number))
        .then_some(number as i64)
}

fn truncate(field: &str, text: &str) -> String {
    let limit = match field {
        "title" => TITLE_MAX_LENGTH,
        "description" => DESCRIPTION_MAX_LENGTH,
        _ => return text.to_owned(),
    };
    text.chars().take(limit).collect()
}

/// Fills gaps from a static per-type template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCorrection;

#[async_trait]
impl CorrectionStrategy for TemplateCorrection {
    fn method(&self) -> CorrectionMethod {
        CorrectionMethod::Template
    }

    async fn correct(
        &self,
        payload: &EventPayload,
        _errors: &[ValidationIssue],
    ) -> AppResult<EventPayload> {
        let event_type = payload.event_type_or_general();
        let mut corrected = event_template(&event_type).ok_or_else(|| {
            AppError::NotFound(format!(
                "no correction template for event type '{}'",
                event_type.as_str()
            ))
        })?;

        for (key, value) in payload.iter() {
            if !is_empty_value(value) {
                corrected.insert(key.clone(), value.clone());
            }
        }

        Ok(corrected)
    }
}
