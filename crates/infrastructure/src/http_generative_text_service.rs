use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tactic_application::GenerativeTextService;
use tactic_core::{AppError, AppResult};
use tactic_domain::{EventPayload, FormFields};
use tracing::{debug, warn};

mod prompts;

use prompts::{autofill_prompt, correction_prompt, form_generation_prompt};

/// Upper bound on attempts per generative call, including the first one.
pub const MAX_GENERATIVE_ATTEMPTS: u8 = 3;

/// Connection settings of the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name, such as `gemini-pro`.
    pub model: String,
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Attempts per call, including the first one. Clamped to
    /// `1..=MAX_GENERATIVE_ATTEMPTS`.
    pub max_attempts: u8,
    /// Base delay of the exponential backoff.
    pub retry_backoff_ms: u64,
}

/// Generative-text adapter backed by the Gemini REST API.
pub struct HttpGenerativeTextService {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpGenerativeTextService {
    /// Creates a client for the configured model.
    #[must_use]
    pub fn new(http_client: reqwest::Client, settings: GeminiSettings) -> Self {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        );

        Self {
            http_client,
            endpoint,
            api_key: settings.api_key,
            max_attempts: settings.max_attempts.clamp(1, MAX_GENERATIVE_ATTEMPTS),
            retry_backoff_ms: settings.retry_backoff_ms.max(50),
        }
    }

    async fn generate_json(&self, prompt: String) -> AppResult<Value> {
        let text = self.generate_with_retry(prompt.as_str()).await?;
        extract_json_object(text.as_str())
    }

    async fn generate_with_retry(&self, prompt: &str) -> AppResult<String> {
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": 0.7,
                "topP": 0.8,
                "topK": 40,
                "maxOutputTokens": 2048,
            },
        });

        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(self.endpoint.as_str())
                .header("x-goog-api-key", self.api_key.as_str())
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    let payload = response.json::<Value>().await.map_err(|error| {
                        AppError::Internal(format!("generative response is not JSON: {error}"))
                    })?;
                    return candidate_text(&payload);
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} from generative provider",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Unavailable(format!(
                        "generative provider rejected the request with status {status}: {body}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("generative provider transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let factor = 1_u64.checked_shl(u32::from(attempt - 1)).unwrap_or(u64::MAX);
                let delay = self.retry_backoff_ms.saturating_mul(factor);
                warn!(
                    attempt,
                    delay_ms = delay,
                    error = last_error.as_deref().unwrap_or_default(),
                    "generative call failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Unavailable(last_error.unwrap_or_else(|| {
            "generative provider exhausted retries".to_owned()
        })))
    }
}

/// Returns the text of the first candidate of a `generateContent` response.
fn candidate_text(response: &Value) -> AppResult<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AppError::Internal("generative response contains no candidate content".to_owned())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(AppError::Internal(
            "generative response candidate has no text".to_owned(),
        ));
    }

    Ok(text)
}

/// Parses the outermost `{...}` span of a model answer, ignoring code fences and prose.
fn extract_json_object(text: &str) -> AppResult<Value> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(AppError::Internal(
            "generative response contains no JSON object".to_owned(),
        ));
    };
    if end < start {
        return Err(AppError::Internal(
            "generative response contains no JSON object".to_owned(),
        ));
    }

    serde_json::from_str(&text[start..=end]).map_err(|error| {
        AppError::Internal(format!("generative response JSON is malformed: {error}"))
    })
}

#[async_trait]
impl GenerativeTextService for HttpGenerativeTextService {
    async fn correct_event(
        &self,
        payload: &EventPayload,
        errors: &[String],
    ) -> AppResult<EventPayload> {
        debug!(errors = errors.len(), "requesting generative correction");
        let corrected = self.generate_json(correction_prompt(payload, errors)).await?;
        EventPayload::from_value(corrected)
    }

    async fn suggest_fields(&self, prompt: &str) -> AppResult<Map<String, Value>> {
        match self.generate_json(autofill_prompt(prompt)).await? {
            Value::Object(suggestions) => Ok(suggestions),
            _ => Err(AppError::Internal(
                "generative suggestions must be a JSON object".to_owned(),
            )),
        }
    }

    async fn generate_form_fields(&self, payload: &EventPayload) -> AppResult<FormFields> {
        let generated = self.generate_json(form_generation_prompt(payload)).await?;
        FormFields::from_value(generated)
    }
}
