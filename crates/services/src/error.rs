//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AttemptId, QuestionError, QuestionId};
use quiz_core::recorder::ResponseSetError;

/// Errors reported by the quiz session state machine.
///
/// These never abort a session; they are surfaced as `SessionEffect::Rejected`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for this attempt")]
    NoQuestions,
    #[error("session already started")]
    AlreadyStarted,
    #[error("attempt id cannot be empty")]
    MissingAttemptId,
    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
    #[error("session is not active")]
    NotActive,
    #[error("select an answer before submitting")]
    NoAnswerSelected,
    #[error("no failed submission to retry")]
    NothingToRetry,
    #[error(transparent)]
    Validation(#[from] ResponseSetError),
}

/// Errors emitted by `QuizBackend` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("invalid quiz api base url: {0}")]
    InvalidBaseUrl(String),
    #[error("attempt {0} not found")]
    NotFound(AttemptId),
    #[error("quiz api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("quiz backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the session host.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Domain(#[from] quiz_core::Error),
}
