//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod change;
mod event;
mod form;
mod validation;

pub use change::{ChangeType, FieldChange, analyze_changes};
pub use event::{
    EventDocument, EventPayload, EventStatus, EventType, is_empty_value, parse_event_date,
};
pub use form::{AutofillSource, FieldType, FormField, FormFields};
pub use validation::{
    EventValidator, REQUIRED_EVENT_FIELDS, ValidationCode, ValidationIssue, ValidationReport,
    extract_field_name, is_missing_required, is_sensitive_metadata_key,
};
