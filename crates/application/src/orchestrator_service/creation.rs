use serde_json::{Value, json};
use tactic_core::EventId;
use tactic_domain::EventPayload;
use tracing::{info, warn};

use super::OrchestratorService;
use super::normalize::{apply_business_defaults, normalize_payload};
use super::tracker::RunTracker;
use crate::event_ports::{CreationReport, HandledEvent, WorkflowType};
use crate::pipeline_error::PipelineError;

impl OrchestratorService {
    /// Runs the creation pipeline for one payload.
    ///
    /// Never fails: every outcome is reported through [`CreationReport`].
    pub async fn orchestrate_event_creation(&self, payload: EventPayload) -> CreationReport {
        let tracker = RunTracker::start(WorkflowType::EventCreation, &payload);
        self.run_creation_workflow(tracker, payload).await
    }

    /// Runs the creation pipeline under a workflow id allocated by the caller.
    pub(super) async fn orchestrate_event_creation_with_id(
        &self,
        workflow_id: String,
        payload: EventPayload,
    ) -> CreationReport {
        let tracker =
            RunTracker::start_with_id(workflow_id, WorkflowType::EventCreation, &payload);
        self.run_creation_workflow(tracker, payload).await
    }

    async fn run_creation_workflow(
        &self,
        mut tracker: RunTracker,
        payload: EventPayload,
    ) -> CreationReport {
        info!(workflow_id = %tracker.workflow_id(), "event creation workflow started");

        match self.run_creation(&mut tracker, payload).await {
            Ok(event_id) => {
                tracker.set_event_id(event_id);
                let run = tracker.complete();
                info!(
                    workflow_id = %run.workflow_id,
                    event_id = %event_id,
                    "event creation workflow completed"
                );
                self.persist_run(&run).await;
                CreationReport::succeeded(&run, event_id)
            }
            Err(error) => {
                let run = tracker.fail(error.to_string());
                warn!(
                    workflow_id = %run.workflow_id,
                    error = %error,
                    "event creation workflow failed"
                );
                self.persist_run(&run).await;
                CreationReport::failed(Some(run.workflow_id), error.to_string())
            }
        }
    }

    async fn run_creation(
        &self,
        tracker: &mut RunTracker,
        payload: EventPayload,
    ) -> Result<EventId, PipelineError> {
        let prepared = self.preprocess_creation(tracker, &payload).await?;
        let handled = self.create_with_recovery(tracker, &payload, prepared.clone()).await?;
        self.postprocess_creation(tracker, handled.event_id, &prepared)
            .await;
        Ok(handled.event_id)
    }

    async fn preprocess_creation(
        &self,
        tracker: &mut RunTracker,
        payload: &EventPayload,
    ) -> Result<EventPayload, PipelineError> {
        let mut prepared = normalize_payload(payload);
        apply_business_defaults(&mut prepared);

        let report = match self.validate(&prepared).await {
            Ok(report) => report,
            Err(error) => {
                tracker.failed_step("preprocess", json!({"error": error.to_string()}));
                return Err(error);
            }
        };

        if report.is_valid() {
            tracker.completed_step(
                "preprocess",
                json!({
                    "corrections_applied": false,
                    "warnings": report
                        .warnings
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                }),
            );
            return Ok(prepared);
        }

        let errors = report.error_messages();
        if !self.fallback_enabled {
            tracker.failed_step("preprocess", json!({"validation_errors": errors}));
            return Err(PipelineError::Validation(errors));
        }

        let correction = self
            .fallback
            .handle_invalid_event(&prepared, &report.errors)
            .await;
        match correction.corrected_payload {
            Some(corrected) if correction.success => {
                tracker.completed_step(
                    "preprocess",
                    json!({
                        "corrections_applied": true,
                        "correction_method": correction.correction_method.as_str(),
                        "original_errors": errors,
                    }),
                );
                Ok(corrected)
            }
            _ => {
                tracker.failed_step(
                    "preprocess",
                    json!({
                        "validation_errors": errors,
                        "correction_error": correction.error,
                    }),
                );
                Err(PipelineError::CorrectionExhausted(errors))
            }
        }
    }

    async fn create_with_recovery(
        &self,
        tracker: &mut RunTracker,
        original: &EventPayload,
        prepared: EventPayload,
    ) -> Result<HandledEvent, PipelineError> {
        let create_error = match self.events.create_event(prepared).await {
            Ok(handled) => {
                tracker.completed_step("create_event", handled_result(&handled));
                return Ok(handled);
            }
            Err(error) => error,
        };

        tracker.failed_step("create_event", json!({"error": create_error.to_string()}));
        if !self.fallback_enabled {
            return Err(PipelineError::PrimaryPersistence(create_error));
        }

        warn!(
            workflow_id = %tracker.workflow_id(),
            error = %create_error,
            "event creation failed, attempting fallback recovery"
        );

        let processed = self.fallback.process_event(original).await;
        let recovered = match processed.processed_payload {
            Some(processed_payload) if processed.success => {
                self.events
                    .create_event(processed_payload)
                    .await
                    .map_err(|error| error.to_string())
            }
            _ => Err(processed
                .error
                .unwrap_or_else(|| "fallback processing failed".to_owned())),
        };

        match recovered {
            Ok(handled) => {
                let mut result = handled_result(&handled);
                result["fallback_applied"] = Value::Bool(processed.fallback_applied);
                tracker.completed_step("fallback_recovery", result);
                Ok(handled)
            }
            Err(recovery_error) => {
                tracker.failed_step("fallback_recovery", json!({"error": recovery_error}));
                Err(PipelineError::PrimaryPersistence(create_error))
            }
        }
    }

    async fn postprocess_creation(
        &self,
        tracker: &mut RunTracker,
        event_id: EventId,
        payload: &EventPayload,
    ) {
        let outcomes = [
            (
                "update_related_events",
                self.side_effects
                    .update_related_events(event_id, payload)
                    .await,
            ),
            (
                "send_creation_notifications",
                self.side_effects
                    .send_creation_notifications(event_id, payload)
                    .await,
            ),
            (
                "update_analytics",
                self.side_effects.update_analytics(event_id, payload).await,
            ),
        ];

        let mut result = serde_json::Map::new();
        for (task, outcome) in outcomes {
            let entry = match outcome {
                Ok(()) => json!({"success": true}),
                Err(error) => {
                    let error = PipelineError::Postprocess { task, error };
                    warn!(event_id = %event_id, error = %error, "postprocess task failed");
                    json!({"success": false, "error": error.to_string()})
                }
            };
            result.insert(task.to_owned(), entry);
        }

        tracker.completed_step("postprocess", Value::Object(result));
    }
}

fn handled_result(handled: &HandledEvent) -> Value {
    json!({
        "event_id": handled.event_id.to_string(),
        "autofill_applied": handled.autofill_applied,
    })
}
