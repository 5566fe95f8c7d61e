mod generative;
mod handler;
mod records;
mod side_effects;
mod storage;
mod validator;

pub use generative::GenerativeTextService;
pub use handler::{EventHandler, HandledEvent};
pub use records::{
    BatchRun, CorrectionMethod, CreationReport, DependentUpdateOutcome, FallbackResult,
    FallbackStatus, StepRecord, StepStatus, UpdateReport, WorkflowRun, WorkflowRunStatus,
    WorkflowType,
};
pub use side_effects::{DependencyKind, EventSideEffects};
pub use storage::{EventDocumentStore, EventMetadataRecord, EventMetadataStore};
pub use validator::EventPayloadValidator;
