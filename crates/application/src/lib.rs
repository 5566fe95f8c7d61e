//! Application services and ports.

#![forbid(unsafe_code)]

mod autofill_service;
mod event_ports;
mod event_service;
mod fallback_service;
mod orchestrator_service;
mod pipeline_error;

#[cfg(test)]
mod test_support;

pub use autofill_service::{
    AppliedFill, AutofillCache, AutofillCacheEntry, AutofillOutcome, AutofillService,
    SIMILARITY_SAMPLE_SIZE,
};
pub use event_ports::{
    BatchRun, CorrectionMethod, CreationReport, DependencyKind, DependentUpdateOutcome,
    EventDocumentStore, EventHandler, EventMetadataRecord, EventMetadataStore,
    EventPayloadValidator, EventSideEffects, FallbackResult, FallbackStatus,
    GenerativeTextService, HandledEvent, StepRecord, StepStatus, UpdateReport, WorkflowRun,
    WorkflowRunStatus, WorkflowType,
};
pub use event_service::EventService;
pub use fallback_service::{
    CorrectionOutcome, CorrectionStrategy, FallbackService, GenerativeCorrection, ProcessOutcome,
    RuleBasedCorrection, TemplateCorrection,
};
pub use orchestrator_service::{MAX_BATCH_CONCURRENCY, OrchestratorService};
pub use pipeline_error::PipelineError;
pub use tokio_util::sync::CancellationToken;
