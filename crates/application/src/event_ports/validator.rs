use async_trait::async_trait;
use tactic_core::AppResult;
use tactic_domain::{EventPayload, EventValidator, ValidationReport};

/// Port for payload validation.
#[async_trait]
pub trait EventPayloadValidator: Send + Sync {
    /// Validates one payload. `Err` means the validator itself failed.
    async fn validate(&self, payload: &EventPayload) -> AppResult<ValidationReport>;
}

#[async_trait]
impl EventPayloadValidator for EventValidator {
    async fn validate(&self, payload: &EventPayload) -> AppResult<ValidationReport> {
        Ok(EventValidator::validate(self, payload))
    }
}
