//! Shared error types for the services crate.

use thiserror::Error;

use srs_core::model::SessionSummaryError;
use srs_core::scheduler::SchedulerError;
use storage::repository::StorageError;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the session layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no cards available for session")]
    Empty,
    #[error("deck or session not found")]
    NotFound,
    #[error("session already completed")]
    Completed,
    #[error("answer not yet revealed for the current card")]
    AnswerNotRevealed,
    #[error("answer already revealed for the current card")]
    AlreadyRevealed,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
