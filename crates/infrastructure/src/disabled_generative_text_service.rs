use async_trait::async_trait;
use serde_json::{Map, Value};
use tactic_application::GenerativeTextService;
use tactic_core::{AppError, AppResult};
use tactic_domain::{EventPayload, FormFields};

/// Generative-text adapter used when no provider is configured.
///
/// Every call fails with [`AppError::Unavailable`], so callers fall through to
/// their deterministic paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerativeTextService;

fn unavailable<T>() -> AppResult<T> {
    Err(AppError::Unavailable(
        "generative text provider is not configured".to_owned(),
    ))
}

#[async_trait]
impl GenerativeTextService for DisabledGenerativeTextService {
    async fn correct_event(
        &self,
        _payload: &EventPayload,
        _errors: &[String],
    ) -> AppResult<EventPayload> {
        unavailable()
    }

    async fn suggest_fields(&self, _prompt: &str) -> AppResult<Map<String, Value>> {
        unavailable()
    }

    async fn generate_form_fields(&self, _payload: &EventPayload) -> AppResult<FormFields> {
        unavailable()
    }
}
