use async_trait::async_trait;
use serde_json::{Map, Value};
use tactic_core::AppResult;
use tactic_domain::{EventPayload, FormFields};

/// Port for the generative-text provider.
#[async_trait]
pub trait GenerativeTextService: Send + Sync {
    /// Asks the provider to repair a payload given literal validation errors.
    async fn correct_event(
        &self,
        payload: &EventPayload,
        errors: &[String],
    ) -> AppResult<EventPayload>;

    /// Asks the provider for values of named form fields.
    async fn suggest_fields(&self, prompt: &str) -> AppResult<Map<String, Value>>;

    /// Asks the provider to design a registration form for an event.
    async fn generate_form_fields(&self, payload: &EventPayload) -> AppResult<FormFields>;
}
