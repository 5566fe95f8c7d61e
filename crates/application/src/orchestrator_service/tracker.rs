use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tactic_core::EventId;
use tactic_domain::EventPayload;
use uuid::Uuid;

use crate::event_ports::{StepRecord, StepStatus, WorkflowRun, WorkflowRunStatus, WorkflowType};

/// Accumulates steps of one run until it reaches a terminal status.
pub(super) struct RunTracker {
    run: WorkflowRun,
    started: Instant,
}

impl RunTracker {
    pub(super) fn start(workflow_type: WorkflowType, payload: &EventPayload) -> Self {
        Self::start_with_id(Uuid::new_v4().to_string(), workflow_type, payload)
    }

    pub(super) fn start_with_id(
        workflow_id: String,
        workflow_type: WorkflowType,
        payload: &EventPayload,
    ) -> Self {
        Self {
            run: WorkflowRun {
                workflow_id,
                workflow_type,
                status: WorkflowRunStatus::Started,
                start_time: Utc::now(),
                end_time: None,
                duration_seconds: None,
                steps: Vec::new(),
                payload: payload.clone(),
                event_id: None,
                error: None,
            },
            started: Instant::now(),
        }
    }

    pub(super) fn workflow_id(&self) -> &str {
        self.run.workflow_id.as_str()
    }

    pub(super) fn set_event_id(&mut self, event_id: EventId) {
        self.run.event_id = Some(event_id);
    }

    pub(super) fn completed_step(&mut self, name: &str, result: Value) {
        self.push(name, StepStatus::Completed, result);
    }

    pub(super) fn failed_step(&mut self, name: &str, result: Value) {
        self.push(name, StepStatus::Failed, result);
    }

    fn push(&mut self, name: &str, status: StepStatus, result: Value) {
        self.run.steps.push(StepRecord {
            name: name.to_owned(),
            status,
            result,
        });
    }

    pub(super) fn complete(self) -> WorkflowRun {
        self.finish(WorkflowRunStatus::Completed, None)
    }

    pub(super) fn fail(self, error: String) -> WorkflowRun {
        self.finish(WorkflowRunStatus::Failed, Some(error))
    }

    fn finish(mut self, status: WorkflowRunStatus, error: Option<String>) -> WorkflowRun {
        self.run.status = status;
        self.run.end_time = Some(Utc::now());
        self.run.duration_seconds = Some(self.started.elapsed().as_secs_f64());
        self.run.error = error;
        self.run
    }
}
