use tactic_core::{AppError, EventId};
use thiserror::Error;

/// Failures raised inside the event pipelines.
///
/// Pipelines convert these to report objects at their public boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The payload failed validation and correction was not attempted.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Every correction strategy failed.
    #[error("validation failed and could not be corrected: {}", .0.join("; "))]
    CorrectionExhausted(Vec<String>),

    /// The generative-text provider failed.
    #[error("generative service failed: {0}")]
    GenerativeService(AppError),

    /// The event does not exist in the document store.
    #[error("event '{0}' not found")]
    EventNotFound(EventId),

    /// The primary document write failed.
    #[error("event persistence failed: {0}")]
    PrimaryPersistence(AppError),

    /// The secondary metadata write failed.
    #[error("metadata persistence failed: {0}")]
    SecondaryPersistence(AppError),

    /// A best-effort postprocess task failed.
    #[error("{task} failed: {error}")]
    Postprocess {
        /// Task name.
        task: &'static str,
        /// Underlying failure.
        error: AppError,
    },
}
