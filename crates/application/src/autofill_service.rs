use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tactic_core::{AppError, AppResult};
use tactic_domain::{AutofillSource, EventPayload, FieldType, FormFields, is_empty_value};
use tracing::{debug, warn};

use crate::event_ports::GenerativeTextService;

mod cache;
mod incremental;

pub use cache::{AutofillCache, AutofillCacheEntry};

/// `(form field name, form field type, payload key)` mapping rules.
const FIELD_MAPPING_RULES: [(&str, &str, &str); 3] = [
    ("email", "email", "contact_email"),
    ("phone", "tel", "contact_phone"),
    ("venue", "text", "location"),
];

const GENERATIVE_CANDIDATE_NAMES: [&str; 4] = ["description", "summary", "notes", "details"];

/// Number of cached events sampled by the similarity layer.
pub const SIMILARITY_SAMPLE_SIZE: usize = 5;

/// One value written by an autofill layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFill {
    /// Filled field name.
    pub field: String,
    /// Layer that produced the value.
    pub source: AutofillSource,
    /// Written value.
    pub value: Value,
}

/// Result of one autofill pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutofillOutcome {
    /// Whether the pass ran.
    pub success: bool,
    /// Form fields after the pass.
    pub form_fields: FormFields,
    /// Whether any field was filled.
    pub autofill_applied: bool,
    /// Filled values in application order.
    pub applied: Vec<AppliedFill>,
}

impl AutofillOutcome {
    fn new(form_fields: FormFields, applied: Vec<AppliedFill>) -> Self {
        Self {
            success: true,
            form_fields,
            autofill_applied: !applied.is_empty(),
            applied,
        }
    }
}

/// Layered form-field population.
#[derive(Clone)]
pub struct AutofillService {
    cache: Arc<AutofillCache>,
    generative: Option<Arc<dyn GenerativeTextService>>,
}

impl AutofillService {
    /// Creates an autofill service backed by a shared cache.
    #[must_use]
    pub fn new(cache: Arc<AutofillCache>) -> Self {
        Self {
            cache,
            generative: None,
        }
    }

    /// Enables the generative suggestion layer.
    #[must_use]
    pub fn with_generative(mut self, generative: Arc<dyn GenerativeTextService>) -> Self {
        self.generative = Some(generative);
        self
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<AutofillCache> {
        &self.cache
    }

    /// Fills empty form fields from rules, generative suggestions and similar
    /// cached events, in that order, then caches the result.
    pub async fn apply_autofill(
        &self,
        form_fields: &FormFields,
        payload: &EventPayload,
    ) -> AppResult<AutofillOutcome> {
        if form_fields.is_empty() {
            return Err(AppError::Validation(
                "no form fields to autofill".to_owned(),
            ));
        }

        let mut form = form_fields.clone();
        let mut applied = apply_rule_layer(&mut form, payload);
        applied.extend(self.apply_generative_layer(&mut form, payload).await);
        applied.extend(self.apply_cache_layer(&mut form, payload).await);

        self.cache
            .insert(AutofillCache::cache_key(payload), payload.clone(), form.clone())
            .await;

        debug!(filled = applied.len(), "autofill pass finished");
        Ok(AutofillOutcome::new(form, applied))
    }

    async fn apply_generative_layer(
        &self,
        form: &mut FormFields,
        payload: &EventPayload,
    ) -> Vec<AppliedFill> {
        let Some(generative) = &self.generative else {
            return Vec::new();
        };

        let candidates: Vec<String> = form
            .fields
            .iter()
            .filter(|field| {
                !field.has_value()
                    && matches!(field.field_type, FieldType::Text | FieldType::Textarea)
                    && GENERATIVE_CANDIDATE_NAMES.contains(&field.name.as_str())
            })
            .map(|field| field.name.clone())
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let prompt = suggestion_prompt(payload, &candidates);
        let suggestions = match generative.suggest_fields(prompt.as_str()).await {
            Ok(suggestions) => suggestions,
            Err(error) => {
                warn!(error = %error, "generative autofill suggestions failed");
                return Vec::new();
            }
        };

        let mut applied = Vec::new();
        for field in &mut form.fields {
            if field.has_value() || !candidates.contains(&field.name) {
                continue;
            }
            let Some(value) = suggestions.get(field.name.as_str()) else {
                continue;
            };
            if is_empty_value(value) {
                continue;
            }

            field.fill(value.clone(), AutofillSource::Ai);
            applied.push(AppliedFill {
                field: field.name.clone(),
                source: AutofillSource::Ai,
                value: value.clone(),
            });
        }

        applied
    }

    async fn apply_cache_layer(
        &self,
        form: &mut FormFields,
        payload: &EventPayload,
    ) -> Vec<AppliedFill> {
        let samples = self
            .cache
            .recent_similar(&payload.event_type_or_general(), SIMILARITY_SAMPLE_SIZE)
            .await;
        if samples.is_empty() {
            return Vec::new();
        }

        let sampled_forms: Vec<FormFields> =
            samples.into_iter().map(|entry| entry.form_fields).collect();
        let winners: HashMap<String, Value> = majority_values(&sampled_forms).into_iter().collect();

        let mut applied = Vec::new();
        for field in &mut form.fields {
            if field.has_value() {
                continue;
            }
            let Some(value) = winners.get(field.name.as_str()) else {
                continue;
            };

            field.fill(value.clone(), AutofillSource::Cache);
            applied.push(AppliedFill {
                field: field.name.clone(),
                source: AutofillSource::Cache,
                value: value.clone(),
            });
        }

        applied
    }
}

/// Fills fields from their mapped payload keys.
///
/// A field is skipped when it already holds a value or when the payload itself
/// carries a value under the field name.
pub(crate) fn apply_rule_layer(form: &mut FormFields, payload: &EventPayload) -> Vec<AppliedFill> {
    let mut applied = Vec::new();

    for field in &mut form.fields {
        if field.has_value() || payload.has_value(field.name.as_str()) {
            continue;
        }

        let source_key = FIELD_MAPPING_RULES
            .iter()
            .find(|(name, field_type, _)| {
                *name == field.name && *field_type == field.field_type.as_str()
            })
            .map(|(_, _, source_key)| *source_key);
        let Some(value) = source_key.and_then(|key| payload.get_non_empty(key)) else {
            continue;
        };

        field.fill(value.clone(), AutofillSource::Rules);
        applied.push(AppliedFill {
            field: field.name.clone(),
            source: AutofillSource::Rules,
            value: value.clone(),
        });
    }

    applied
}

#[derive(Default)]
struct FieldTally {
    values: Vec<(Value, usize)>,
    samples: usize,
}

/// Returns the majority value of every field observed across sampled forms.
///
/// Forms are ordered newest first. A value wins when it holds at least 60% of the
/// non-empty samples for its field; ties go to the value seen first.
pub(crate) fn majority_values(forms: &[FormFields]) -> Vec<(String, Value)> {
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, FieldTally> = HashMap::new();

    for form in forms {
        for field in &form.fields {
            let Some(value) = field.value.as_ref().filter(|value| !is_empty_value(value)) else {
                continue;
            };

            let tally = tallies.entry(field.name.clone()).or_insert_with(|| {
                order.push(field.name.clone());
                FieldTally::default()
            });
            tally.samples += 1;
            match tally.values.iter_mut().find(|(seen, _)| seen == value) {
                Some((_, count)) => *count += 1,
                None => tally.values.push((value.clone(), 1)),
            }
        }
    }

    order
        .into_iter()
        .filter_map(|name| {
            let tally = tallies.remove(&name)?;
            let mut winner: Option<&(Value, usize)> = None;
            for candidate in &tally.values {
                if winner.is_none_or(|(_, best)| candidate.1 > *best) {
                    winner = Some(candidate);
                }
            }

            let (value, count) = winner?;
            (count * 5 >= tally.samples * 3).then(|| (name, value.clone()))
        })
        .collect()
}

fn suggestion_prompt(payload: &EventPayload, candidates: &[String]) -> String {
    format!(
        "Suggest values for the following form fields of a {} event titled \"{}\": {}. \
         Event details: {}. Respond with a JSON object mapping each field name to a short value.",
        payload.event_type_or_general().as_str(),
        payload.title().unwrap_or("Untitled Event"),
        candidates.join(", "),
        Value::Object(payload.as_map().clone())
    )
}

#[cfg(test)]
mod tests;
