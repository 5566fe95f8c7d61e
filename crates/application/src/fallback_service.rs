use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tactic_core::AppResult;
use tactic_domain::{EventPayload, ValidationIssue};
use tracing::{info, warn};
use uuid::Uuid;

use crate::event_ports::{
    CorrectionMethod, EventMetadataStore, EventPayloadValidator, FallbackResult, FallbackStatus,
    GenerativeTextService,
};

mod process;
mod strategies;
mod templates;

pub use process::ProcessOutcome;
pub use strategies::{GenerativeCorrection, RuleBasedCorrection, TemplateCorrection};

const CORRECTION_EXHAUSTED_MESSAGE: &str = "Unable to correct validation errors";

/// One way of repairing a payload that failed validation.
#[async_trait]
pub trait CorrectionStrategy: Send + Sync {
    /// Method recorded when this strategy wins.
    fn method(&self) -> CorrectionMethod;

    /// Produces a candidate payload. The candidate is re-validated by the caller.
    async fn correct(
        &self,
        payload: &EventPayload,
        errors: &[ValidationIssue],
    ) -> AppResult<EventPayload>;
}

/// Result of one correction cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    /// Whether a strategy produced a valid payload.
    pub success: bool,
    /// Repaired payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_payload: Option<EventPayload>,
    /// Winning strategy, or `none`.
    pub correction_method: CorrectionMethod,
    /// Errors the cascade started from.
    pub original_errors: Vec<String>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Correction cascade for payloads that failed validation.
#[derive(Clone)]
pub struct FallbackService {
    strategies: Vec<Arc<dyn CorrectionStrategy>>,
    validator: Arc<dyn EventPayloadValidator>,
    metadata_store: Arc<dyn EventMetadataStore>,
}

impl FallbackService {
    /// Creates a cascade with the rule and template strategies.
    #[must_use]
    pub fn new(
        validator: Arc<dyn EventPayloadValidator>,
        metadata_store: Arc<dyn EventMetadataStore>,
    ) -> Self {
        Self {
            strategies: vec![
                Arc::new(RuleBasedCorrection),
                Arc::new(TemplateCorrection),
            ],
            validator,
            metadata_store,
        }
    }

    /// Puts generative correction in front of the cascade.
    #[must_use]
    pub fn with_generative(mut self, generative: Arc<dyn GenerativeTextService>) -> Self {
        self.strategies
            .insert(0, Arc::new(GenerativeCorrection::new(generative)));
        self
    }

    /// Replaces the strategy list.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Arc<dyn CorrectionStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Methods of the configured strategies, in cascade order.
    #[must_use]
    pub fn strategy_methods(&self) -> Vec<CorrectionMethod> {
        self.strategies
            .iter()
            .map(|strategy| strategy.method())
            .collect()
    }

    /// Runs the strategies in order until one yields a payload that re-validates.
    pub async fn handle_invalid_event(
        &self,
        payload: &EventPayload,
        errors: &[ValidationIssue],
    ) -> CorrectionOutcome {
        let original_errors: Vec<String> = errors.iter().map(ToString::to_string).collect();

        for strategy in &self.strategies {
            let method = strategy.method();
            let candidate = match strategy.correct(payload, errors).await {
                Ok(candidate) => candidate,
                Err(error) => {
                    warn!(method = method.as_str(), error = %error, "correction strategy failed");
                    continue;
                }
            };

            if !self.revalidates(&candidate, method).await {
                continue;
            }

            info!(method = method.as_str(), "payload corrected");
            self.record_result(
                payload,
                Some(candidate.clone()),
                FallbackStatus::Success,
                method,
                &original_errors,
            )
            .await;

            return CorrectionOutcome {
                success: true,
                corrected_payload: Some(candidate),
                correction_method: method,
                original_errors,
                error: None,
            };
        }

        warn!(errors = original_errors.len(), "all correction strategies failed");
        self.record_result(
            payload,
            None,
            FallbackStatus::Failed,
            CorrectionMethod::None,
            &original_errors,
        )
        .await;

        CorrectionOutcome {
            success: false,
            corrected_payload: None,
            correction_method: CorrectionMethod::None,
            original_errors,
            error: Some(CORRECTION_EXHAUSTED_MESSAGE.to_owned()),
        }
    }

    async fn revalidates(&self, candidate: &EventPayload, method: CorrectionMethod) -> bool {
        match self.validator.validate(candidate).await {
            Ok(report) if report.is_valid() => true,
            Ok(report) => {
                warn!(
                    method = method.as_str(),
                    remaining = %report.error_messages().join("; "),
                    "corrected payload still invalid"
                );
                false
            }
            Err(error) => {
                warn!(method = method.as_str(), error = %error, "revalidation failed");
                false
            }
        }
    }

    async fn record_result(
        &self,
        original_payload: &EventPayload,
        processed_payload: Option<EventPayload>,
        status: FallbackStatus,
        correction_method: CorrectionMethod,
        errors: &[String],
    ) {
        let result = FallbackResult {
            fallback_id: Uuid::new_v4().to_string(),
            original_payload: original_payload.clone(),
            processed_payload,
            status,
            correction_method,
            errors: errors.to_vec(),
            timestamp: Utc::now(),
        };

        if let Err(error) = self.metadata_store.store_fallback_result(&result).await {
            warn!(
                fallback_id = %result.fallback_id,
                error = %error,
                "failed to persist fallback result"
            );
        }
    }
}

#[cfg(test)]
mod tests;
