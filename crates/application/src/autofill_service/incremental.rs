use serde_json::{Value, json};
use tactic_domain::{AutofillSource, EventPayload, FormFields};

use super::{AppliedFill, AutofillOutcome, AutofillService};

/// Payload keys whose change refreshes related form fields.
const DEPENDENCY_TRIGGERS: [(&str, &[&str]); 4] = [
    ("event_type", &["description", "requirements", "materials"]),
    ("title", &["description", "summary"]),
    ("venue", &["address", "capacity", "amenities"]),
    ("category", &["tags", "keywords"]),
];

impl AutofillService {
    /// Refreshes form fields that depend on changed payload keys.
    ///
    /// Only fields that are empty or were autofilled before are touched, so values
    /// typed by a person survive updates.
    #[must_use]
    pub fn apply_autofill_updates(
        &self,
        form_fields: &FormFields,
        patch: &EventPayload,
    ) -> AutofillOutcome {
        let mut form = form_fields.clone();
        let mut applied = Vec::new();

        for (trigger, related_fields) in DEPENDENCY_TRIGGERS {
            let Some(trigger_value) = patch.get_non_empty(trigger) else {
                continue;
            };

            for related in related_fields {
                let Some(default) = dependent_default(related, trigger_value) else {
                    continue;
                };
                let Some(field) = form.fields.iter_mut().find(|field| field.name == *related)
                else {
                    continue;
                };
                if field.has_value() && !field.autofilled {
                    continue;
                }

                field.fill(default.clone(), AutofillSource::Incremental);
                applied.push(AppliedFill {
                    field: field.name.clone(),
                    source: AutofillSource::Incremental,
                    value: default,
                });
            }
        }

        AutofillOutcome::new(form, applied)
    }
}

fn dependent_default(field: &str, trigger_value: &Value) -> Option<Value> {
    let rendered = match trigger_value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    match field {
        "description" => Some(Value::String(format!("Description for {rendered}"))),
        "summary" => Some(Value::String(format!("Summary of {rendered}"))),
        "address" => Some(Value::String("Default address".to_owned())),
        "capacity" => Some(json!(100)),
        "tags" => Some(json!([trigger_value])),
        _ => None,
    }
}
