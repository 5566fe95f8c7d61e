use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tactic_core::{AppError, AppResult, EventId};
use tactic_domain::{EventPayload, FieldChange};

use super::side_effects::DependencyKind;

/// Pipeline kind tracked by one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// Event creation pipeline.
    EventCreation,
    /// Event update pipeline.
    EventUpdate,
}

impl WorkflowType {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventCreation => "event_creation",
            Self::EventUpdate => "event_update",
        }
    }
}

/// Lifecycle status of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
    /// Run is executing.
    Started,
    /// Run finished successfully.
    Completed,
    /// Run stopped at a failed step.
    Failed,
}

impl WorkflowRunStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown workflow run status '{value}'"
            ))),
        }
    }
}

/// Status of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step succeeded.
    Completed,
    /// Step failed.
    Failed,
}

impl StepStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// One executed pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name, such as `preprocess` or `create_event`.
    pub name: String,
    /// Step status.
    pub status: StepStatus,
    /// Structured step output.
    pub result: Value,
}

/// Audit record of one creation or update pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Stable run identifier.
    pub workflow_id: String,
    /// Pipeline kind.
    pub workflow_type: WorkflowType,
    /// Lifecycle status.
    pub status: WorkflowRunStatus,
    /// Run start timestamp.
    pub start_time: DateTime<Utc>,
    /// Run finish timestamp.
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Executed steps in order.
    pub steps: Vec<StepRecord>,
    /// Payload the run was started with.
    pub payload: EventPayload,
    /// Event the run created or updated.
    pub event_id: Option<EventId>,
    /// Failure message for failed runs.
    pub error: Option<String>,
}

impl WorkflowRun {
    /// Number of steps that completed.
    #[must_use]
    pub fn steps_completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .count()
    }
}

/// Outcome of one correction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStatus {
    /// The payload was repaired.
    Success,
    /// No strategy produced a valid payload.
    Failed,
}

impl FallbackStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Correction strategy that produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// Generative-text repair.
    Ai,
    /// Deterministic rule repair.
    Rules,
    /// Static template merge.
    Template,
    /// Nothing succeeded.
    None,
}

impl CorrectionMethod {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Rules => "rules",
            Self::Template => "template",
            Self::None => "none",
        }
    }
}

/// Audit record of one correction attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackResult {
    /// Stable record identifier.
    pub fallback_id: String,
    /// Payload before correction.
    pub original_payload: EventPayload,
    /// Payload after correction, when one was produced.
    pub processed_payload: Option<EventPayload>,
    /// Outcome.
    pub status: FallbackStatus,
    /// Winning strategy, or `none`.
    pub correction_method: CorrectionMethod,
    /// Validation errors the attempt started from.
    pub errors: Vec<String>,
    /// Attempt timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Report returned by the creation pipeline and by each batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationReport {
    /// Whether the event was persisted.
    pub success: bool,
    /// Run identifier, absent when the pipeline never started a run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Persisted event identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Wall-clock duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Number of steps that completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_completed: Option<usize>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreationReport {
    /// Builds the report of a completed run.
    #[must_use]
    pub fn succeeded(run: &WorkflowRun, event_id: EventId) -> Self {
        Self {
            success: true,
            workflow_id: Some(run.workflow_id.clone()),
            event_id: Some(event_id),
            duration: run.duration_seconds,
            steps_completed: Some(run.steps_completed()),
            error: None,
        }
    }

    /// Builds the report of a failed run or batch item.
    #[must_use]
    pub fn failed(workflow_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            workflow_id,
            event_id: None,
            duration: None,
            steps_completed: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one dependency propagation after an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentUpdateOutcome {
    /// Changed field.
    pub field: String,
    /// Dependency kind dispatched.
    pub kind: DependencyKind,
    /// Whether propagation succeeded.
    pub success: bool,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report returned by the update pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Whether the patch was persisted.
    pub success: bool,
    /// Run identifier.
    pub workflow_id: String,
    /// Updated event identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Field differences applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes_applied: Vec<FieldChange>,
    /// Dependency propagation outcomes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_updates: Vec<DependentUpdateOutcome>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit record and report of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    /// Always true: item failures never fail the batch.
    pub success: bool,
    /// Stable batch identifier.
    pub batch_id: String,
    /// Number of submitted payloads.
    pub total_events: usize,
    /// Number of items that persisted an event.
    pub processed_events: usize,
    /// Number of items that failed.
    pub failed_events: usize,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    /// Per-item reports in input order.
    pub results: Vec<CreationReport>,
    /// Batch start timestamp.
    pub started_at: DateTime<Utc>,
}
