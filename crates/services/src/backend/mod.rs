//! Boundary between a quiz session and the service that owns attempts.

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    AttemptId, Question, QuestionId, QuestionRecord, QuestionResponse, QuizResult,
};

use crate::error::BackendError;

pub use http::{HttpQuizBackend, QuizApiConfig};
pub use memory::InMemoryBackend;

/// Everything a session needs to start, resolved once per attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPayload {
    pub attempt_id: AttemptId,
    pub questions: Vec<Question>,
    pub time_limit_secs: u32,
}

/// JSON shape of [`SessionPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPayloadRecord {
    pub attempt_id: AttemptId,
    pub questions: Vec<QuestionRecord>,
    pub time_limit_seconds: u32,
}

impl SessionPayloadRecord {
    /// Validate every question in the payload.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidQuestion` for the first malformed question.
    pub fn validate(self) -> Result<SessionPayload, BackendError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionRecord::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SessionPayload {
            attempt_id: self.attempt_id,
            questions,
            time_limit_secs: self.time_limit_seconds,
        })
    }
}

/// Body of an incremental per-question submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
    pub student_answer: String,
    pub time_taken: u32,
}

impl From<&QuestionResponse> for ResponseSubmission {
    fn from(response: &QuestionResponse) -> Self {
        Self {
            attempt_id: response.attempt_id.clone(),
            question_id: response.question_id.clone(),
            student_answer: response.student_answer.clone(),
            time_taken: response.time_taken,
        }
    }
}

/// Acknowledgement of a final submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub attempt_id: AttemptId,
    pub status: String,
}

impl SubmitReceipt {
    pub const COMPLETED: &'static str = "completed";

    #[must_use]
    pub fn completed(attempt_id: AttemptId) -> Self {
        Self {
            attempt_id,
            status: Self::COMPLETED.to_string(),
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Self::COMPLETED
    }
}

/// Backend contract used by the session host.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Resolve an attempt into its question list and time limit.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` for unknown attempts, or transport errors.
    async fn fetch_session(&self, attempt_id: &AttemptId) -> Result<SessionPayload, BackendError>;

    /// Persist a single answer as soon as it is recorded.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend rejects or cannot store the answer.
    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<(), BackendError>;

    /// Submit the finished, ordered response set.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` unless the backend reports the attempt completed.
    async fn submit_quiz(
        &self,
        attempt_id: &AttemptId,
        responses: &[QuestionResponse],
    ) -> Result<SubmitReceipt, BackendError>;

    /// Fetch the graded result of a submitted attempt.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if nothing was submitted for the attempt.
    async fn fetch_result(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError>;
}
