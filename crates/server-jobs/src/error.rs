// crates/server-jobs/src/error.rs
use slidegen_core::{JobId, ProgressError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Job {0} is already active")]
    AlreadyActive(JobId),

    #[error("No tokio runtime available to run job {0}")]
    NoRuntime(JobId),
}

/// Failure reported by a [`crate::ProgressSink`] implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error("failed to persist progress: {0}")]
    Sink(#[from] SinkError),
}
