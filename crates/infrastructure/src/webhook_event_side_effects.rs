use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tactic_application::{DependencyKind, EventSideEffects};
use tactic_core::{AppError, AppResult, EventId};
use tactic_domain::EventPayload;

/// Side-effect adapter that posts every hook to one notification webhook.
pub struct WebhookEventSideEffects {
    http_client: reqwest::Client,
    endpoint: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl WebhookEventSideEffects {
    /// Creates a webhook adapter.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }

    async fn post_with_retry(&self, hook: &str, event_id: EventId, body: Value) -> AppResult<()> {
        let event_id = event_id.to_string();
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(self.endpoint.as_str())
                .header("X-Tactic-Event", event_id.as_str())
                .header("X-Tactic-Hook", hook)
                .json(&json!({"hook": hook, "event_id": event_id, "data": body}))
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} for hook '{hook}' of event '{event_id}'",
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
                        "webhook rejected hook '{hook}' with status {status}: {body}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("webhook transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Unavailable(last_error.unwrap_or_else(|| {
            "webhook delivery exhausted retries".to_owned()
        })))
    }
}

#[async_trait]
impl EventSideEffects for WebhookEventSideEffects {
    async fn update_related_events(
        &self,
        event_id: EventId,
        payload: &EventPayload,
    ) -> AppResult<()> {
        self.post_with_retry(
            "event.related",
            event_id,
            json!({"event_type": payload.get("event_type")}),
        )
        .await
    }

    async fn send_creation_notifications(
        &self,
        event_id: EventId,
        payload: &EventPayload,
    ) -> AppResult<()> {
        self.post_with_retry("event.created", event_id, payload.clone().into_value())
            .await
    }

    async fn update_analytics(&self, event_id: EventId, payload: &EventPayload) -> AppResult<()> {
        self.post_with_retry(
            "event.analytics",
            event_id,
            json!({
                "event_type": payload.get("event_type"),
                "field_count": payload.len(),
            }),
        )
        .await
    }

    async fn propagate_dependency(
        &self,
        event_id: EventId,
        kind: DependencyKind,
        value: &Value,
    ) -> AppResult<()> {
        self.post_with_retry(
            "event.dependency",
            event_id,
            json!({"dependency": kind.as_str(), "value": value}),
        )
        .await
    }
}
