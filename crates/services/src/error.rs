//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::AttemptError;
use storage::repository::StorageError;

/// Errors emitted by the quiz session workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("quiz session is not completed")]
    NotCompleted,
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
