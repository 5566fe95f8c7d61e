use serde_json::json;
use tactic_core::EventId;
use tactic_domain::{EventDocument, EventPayload, FieldChange, analyze_changes};
use tracing::{info, warn};

use super::OrchestratorService;
use super::normalize::normalize_payload;
use super::tracker::RunTracker;
use crate::event_ports::{DependencyKind, DependentUpdateOutcome, UpdateReport, WorkflowType};
use crate::pipeline_error::PipelineError;

impl OrchestratorService {
    /// Runs the update pipeline for one patch.
    ///
    /// Never fails: every outcome is reported through [`UpdateReport`].
    pub async fn orchestrate_event_update(
        &self,
        event_id: EventId,
        patch: EventPayload,
    ) -> UpdateReport {
        let mut tracker = RunTracker::start(WorkflowType::EventUpdate, &patch);
        tracker.set_event_id(event_id);
        info!(
            workflow_id = %tracker.workflow_id(),
            event_id = %event_id,
            "event update workflow started"
        );

        match self.run_update(&mut tracker, event_id, patch).await {
            Ok((changes_applied, dependent_updates)) => {
                let run = tracker.complete();
                self.persist_run(&run).await;
                UpdateReport {
                    success: true,
                    workflow_id: run.workflow_id,
                    event_id: Some(event_id),
                    changes_applied,
                    dependent_updates,
                    error: None,
                }
            }
            Err(error) => {
                let run = tracker.fail(error.to_string());
                warn!(
                    workflow_id = %run.workflow_id,
                    error = %error,
                    "event update workflow failed"
                );
                self.persist_run(&run).await;
                UpdateReport {
                    success: false,
                    workflow_id: run.workflow_id,
                    event_id: Some(event_id),
                    changes_applied: Vec::new(),
                    dependent_updates: Vec::new(),
                    error: Some(error.to_string()),
                }
            }
        }
    }

    async fn run_update(
        &self,
        tracker: &mut RunTracker,
        event_id: EventId,
        patch: EventPayload,
    ) -> Result<(Vec<FieldChange>, Vec<DependentUpdateOutcome>), PipelineError> {
        let stored = self.load_event(tracker, event_id).await?;

        // Stored data is normalized, so the patch is compared in the same form.
        let changes = analyze_changes(stored.data(), &normalize_payload(&patch));
        tracker.completed_step(
            "analyze_changes",
            json!({
                "changes": changes.len(),
                "fields": changes.iter().map(|change| change.field.as_str()).collect::<Vec<_>>(),
            }),
        );

        let prepared = self.preprocess_update(tracker, &stored, &patch).await?;
        self.update_with_recovery(tracker, &stored, &patch, prepared)
            .await?;

        let dependent_updates = self.dependent_updates(event_id, &changes).await;
        tracker.completed_step(
            "dependent_updates",
            serde_json::to_value(&dependent_updates).unwrap_or_default(),
        );

        Ok((changes, dependent_updates))
    }

    async fn load_event(
        &self,
        tracker: &mut RunTracker,
        event_id: EventId,
    ) -> Result<EventDocument, PipelineError> {
        match self.documents.get(event_id).await {
            Ok(Some(document)) => {
                tracker.completed_step("validate_event", json!({"exists": true}));
                Ok(document)
            }
            Ok(None) => {
                tracker.failed_step("validate_event", json!({"exists": false}));
                Err(PipelineError::EventNotFound(event_id))
            }
            Err(error) => {
                tracker.failed_step("validate_event", json!({"error": error.to_string()}));
                Err(PipelineError::PrimaryPersistence(error))
            }
        }
    }

    async fn preprocess_update(
        &self,
        tracker: &mut RunTracker,
        stored: &EventDocument,
        patch: &EventPayload,
    ) -> Result<EventPayload, PipelineError> {
        let mut prepared = normalize_payload(patch);
        let merged = stored.data().overlaid_with(&prepared);

        let report = match self.validate(&merged).await {
            Ok(report) => report,
            Err(error) => {
                tracker.failed_step("preprocess", json!({"error": error.to_string()}));
                return Err(error);
            }
        };
        if report.is_valid() {
            tracker.completed_step("preprocess", json!({"corrections_applied": false}));
            return Ok(prepared);
        }

        let errors = report.error_messages();
        if !self.fallback_enabled {
            tracker.failed_step("preprocess", json!({"validation_errors": errors}));
            return Err(PipelineError::Validation(errors));
        }

        let correction = self
            .fallback
            .handle_invalid_event(&merged, &report.errors)
            .await;
        let Some(corrected) = correction.corrected_payload.filter(|_| correction.success) else {
            tracker.failed_step(
                "preprocess",
                json!({
                    "validation_errors": errors,
                    "correction_error": correction.error,
                }),
            );
            return Err(PipelineError::CorrectionExhausted(errors));
        };

        for (key, value) in corrected.iter() {
            if prepared.contains_key(key) || stored.data().get(key) != Some(value) {
                prepared.insert(key.clone(), value.clone());
            }
        }

        tracker.completed_step(
            "preprocess",
            json!({
                "corrections_applied": true,
                "correction_method": correction.correction_method.as_str(),
                "original_errors": errors,
            }),
        );
        Ok(prepared)
    }

    async fn update_with_recovery(
        &self,
        tracker: &mut RunTracker,
        stored: &EventDocument,
        original_patch: &EventPayload,
        prepared: EventPayload,
    ) -> Result<(), PipelineError> {
        let event_id = stored.event_id();
        let update_error = match self.events.update_event(event_id, prepared).await {
            Ok(handled) => {
                tracker.completed_step(
                    "update_event",
                    json!({"autofill_applied": handled.autofill_applied}),
                );
                return Ok(());
            }
            Err(error) => error,
        };

        tracker.failed_step("update_event", json!({"error": update_error.to_string()}));
        if !self.fallback_enabled {
            return Err(PipelineError::PrimaryPersistence(update_error));
        }

        warn!(
            workflow_id = %tracker.workflow_id(),
            error = %update_error,
            "event update failed, attempting fallback recovery"
        );

        let processed = self
            .fallback
            .process_event(&stored.data().overlaid_with(original_patch))
            .await;
        let recovered = match processed.processed_payload {
            Some(processed_payload) if processed.success => self
                .events
                .update_event(event_id, processed_payload)
                .await
                .map_err(|error| error.to_string()),
            _ => Err(processed
                .error
                .unwrap_or_else(|| "fallback processing failed".to_owned())),
        };

        match recovered {
            Ok(handled) => {
                tracker.completed_step(
                    "fallback_recovery",
                    json!({
                        "autofill_applied": handled.autofill_applied,
                        "fallback_applied": processed.fallback_applied,
                    }),
                );
                Ok(())
            }
            Err(recovery_error) => {
                tracker.failed_step("fallback_recovery", json!({"error": recovery_error}));
                Err(PipelineError::PrimaryPersistence(update_error))
            }
        }
    }

    async fn dependent_updates(
        &self,
        event_id: EventId,
        changes: &[FieldChange],
    ) -> Vec<DependentUpdateOutcome> {
        let mut outcomes = Vec::new();

        for change in changes {
            let Some(kind) = DependencyKind::for_field(change.field.as_str()) else {
                continue;
            };

            let outcome = self
                .side_effects
                .propagate_dependency(event_id, kind, &change.new_value)
                .await;
            if let Err(error) = &outcome {
                warn!(
                    event_id = %event_id,
                    dependency = kind.as_str(),
                    error = %error,
                    "dependency propagation failed"
                );
            }

            outcomes.push(DependentUpdateOutcome {
                field: change.field.clone(),
                kind,
                success: outcome.is_ok(),
                error: outcome.err().map(|error| error.to_string()),
            });
        }

        outcomes
    }
}
