use tactic_domain::EventPayload;

const FORM_INSTRUCTIONS: &str = "You are an expert form designer. Generate registration form fields \
for the event described below.

Return a JSON object with this structure:
{\"fields\": [{\"name\": \"field_name\", \"type\": \"field_type\", \"label\": \"Field Label\", \
\"required\": true, \"options\": [\"option1\"]}]}

Field types: text, email, tel, number, date, time, datetime, textarea, select, checkbox, radio.
Include contact information (name, email, phone) and fields specific to the event type.";

const CORRECTION_INSTRUCTIONS: &str = "You are a data validation expert. Correct the event data \
below so that it passes validation.

Return only a JSON object with the corrected data. Preserve as much of the original data as \
possible: fix typos and formatting, add missing required fields with reasonable defaults, \
convert data types where appropriate and remove invalid data rather than guessing.";

const AUTOFILL_INSTRUCTIONS: &str = "Suggest values for the requested form fields based on the \
event information below.

Return a JSON object with field names as keys and suggested values as values. Suggestions must \
be relevant to the event type and details.";

pub(super) fn form_generation_prompt(payload: &EventPayload) -> String {
    format!(
        "{FORM_INSTRUCTIONS}\n\nEvent:\n{}",
        pretty_payload(payload)
    )
}

pub(super) fn correction_prompt(payload: &EventPayload, errors: &[String]) -> String {
    let errors = errors
        .iter()
        .map(|error| format!("- {error}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{CORRECTION_INSTRUCTIONS}\n\nEvent data:\n{}\n\nValidation errors:\n{errors}",
        pretty_payload(payload)
    )
}

pub(super) fn autofill_prompt(prompt: &str) -> String {
    format!("{AUTOFILL_INSTRUCTIONS}\n\n{prompt}")
}

fn pretty_payload(payload: &EventPayload) -> String {
    serde_json::to_string_pretty(payload.as_map()).unwrap_or_else(|_| "{}".to_owned())
}
