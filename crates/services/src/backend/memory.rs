use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quiz_core::model::{AttemptId, Question, QuestionResponse, QuizResult};

use super::{QuizBackend, ResponseSubmission, SessionPayload, SubmitReceipt};
use crate::error::BackendError;

#[derive(Default)]
struct State {
    sessions: HashMap<AttemptId, SessionPayload>,
    responses: Vec<ResponseSubmission>,
    submissions: HashMap<AttemptId, Vec<QuestionResponse>>,
    submit_calls: usize,
    failing_submits: usize,
    failing_responses: usize,
}

/// In-memory quiz backend for tests and offline demos.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    /// Register an attempt that `fetch_session` will resolve.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn seed_session(
        &self,
        attempt_id: AttemptId,
        questions: Vec<Question>,
        time_limit_secs: u32,
    ) -> Result<(), BackendError> {
        let mut guard = self.lock()?;
        guard.sessions.insert(
            attempt_id.clone(),
            SessionPayload {
                attempt_id,
                questions,
                time_limit_secs,
            },
        );
        Ok(())
    }

    /// Make the next `count` final submissions fail.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn fail_next_submits(&self, count: usize) -> Result<(), BackendError> {
        self.lock()?.failing_submits = count;
        Ok(())
    }

    /// Make the next `count` per-question submissions fail.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn fail_next_responses(&self, count: usize) -> Result<(), BackendError> {
        self.lock()?.failing_responses = count;
        Ok(())
    }

    /// Per-question submissions received so far.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn recorded_responses(&self) -> Result<Vec<ResponseSubmission>, BackendError> {
        Ok(self.lock()?.responses.clone())
    }

    /// Final response set stored for an attempt, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn submission(
        &self,
        attempt_id: &AttemptId,
    ) -> Result<Option<Vec<QuestionResponse>>, BackendError> {
        Ok(self.lock()?.submissions.get(attempt_id).cloned())
    }

    /// Number of `submit_quiz` calls, failed ones included.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn submit_calls(&self) -> Result<usize, BackendError> {
        Ok(self.lock()?.submit_calls)
    }
}

#[async_trait]
impl QuizBackend for InMemoryBackend {
    async fn fetch_session(&self, attempt_id: &AttemptId) -> Result<SessionPayload, BackendError> {
        let guard = self.lock()?;
        guard
            .sessions
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(attempt_id.clone()))
    }

    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<(), BackendError> {
        let mut guard = self.lock()?;
        if guard.failing_responses > 0 {
            guard.failing_responses -= 1;
            return Err(BackendError::Unavailable("response store offline".into()));
        }
        guard.responses.push(submission.clone());
        Ok(())
    }

    async fn submit_quiz(
        &self,
        attempt_id: &AttemptId,
        responses: &[QuestionResponse],
    ) -> Result<SubmitReceipt, BackendError> {
        let mut guard = self.lock()?;
        guard.submit_calls += 1;
        if !guard.sessions.contains_key(attempt_id) {
            return Err(BackendError::NotFound(attempt_id.clone()));
        }
        if guard.failing_submits > 0 {
            guard.failing_submits -= 1;
            return Err(BackendError::Unavailable("submission store offline".into()));
        }
        guard
            .submissions
            .insert(attempt_id.clone(), responses.to_vec());
        Ok(SubmitReceipt::completed(attempt_id.clone()))
    }

    async fn fetch_result(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError> {
        let guard = self.lock()?;
        let (Some(session), Some(responses)) = (
            guard.sessions.get(attempt_id),
            guard.submissions.get(attempt_id),
        ) else {
            return Err(BackendError::NotFound(attempt_id.clone()));
        };
        QuizResult::from_responses(&session.questions, responses.clone())
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;
    use quiz_core::time::fixed_now;

    fn question(id: &str) -> Question {
        Question::new(QuestionId::new(id), "Prompt", vec!["A".into()], "A", 5).unwrap()
    }

    #[tokio::test]
    async fn unknown_attempt_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend
            .fetch_session(&AttemptId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let backend = InMemoryBackend::new();
        let attempt = AttemptId::new("att");
        backend
            .seed_session(attempt.clone(), vec![question("q1")], 60)
            .unwrap();
        backend.fail_next_submits(1).unwrap();

        let response =
            QuestionResponse::evaluate(attempt.clone(), &question("q1"), Some("A"), 2, fixed_now());
        assert!(backend.submit_quiz(&attempt, &[response.clone()]).await.is_err());
        let receipt = backend.submit_quiz(&attempt, &[response]).await.unwrap();

        assert!(receipt.is_completed());
        assert_eq!(backend.submit_calls().unwrap(), 2);
        let result = backend.fetch_result(&attempt).await.unwrap();
        assert_eq!(result.score, 100.0);
    }
}
