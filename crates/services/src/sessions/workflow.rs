use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use quiz_core::model::{AttemptId, QuestionResponse, QuizResult, SessionSettings};
use quiz_core::Clock;

use super::service::{QuizSession, SessionAction, SessionEffect, SessionStatus};
use crate::backend::{QuizBackend, ResponseSubmission, SubmitReceipt};
use crate::error::{BackendError, HostError, SessionError};
use crate::timer::Ticker;

/// Graded outcome of an accepted final submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub status: SessionStatus,
    pub receipt: SubmitReceipt,
    pub result: QuizResult,
}

/// What one host action produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuizUpdate {
    pub effects: Vec<SessionEffect>,
    /// Set once the final submission was accepted.
    pub outcome: Option<QuizOutcome>,
}

impl QuizUpdate {
    #[must_use]
    pub fn rejection(&self) -> Option<&SessionError> {
        self.effects.iter().find_map(|effect| match effect {
            SessionEffect::Rejected(err) => Some(err),
            _ => None,
        })
    }

    #[must_use]
    pub fn time_warning(&self) -> Option<u32> {
        self.effects.iter().find_map(|effect| match effect {
            SessionEffect::TimeWarning { remaining_secs } => Some(*remaining_secs),
            _ => None,
        })
    }
}

/// Resolves attempts from a backend and hands out running quizzes.
#[derive(Clone)]
pub struct QuizSessionHost {
    clock: Clock,
    backend: Arc<dyn QuizBackend>,
    settings: SessionSettings,
}

impl QuizSessionHost {
    #[must_use]
    pub fn new(clock: Clock, backend: Arc<dyn QuizBackend>) -> Self {
        Self {
            clock,
            backend,
            settings: SessionSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Fetch the attempt once and start its session.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` if the attempt cannot be resolved and
    /// `HostError::Session(NoQuestions)` if it has nothing to ask.
    pub async fn start(&self, attempt_id: &AttemptId) -> Result<ActiveQuiz, HostError> {
        let payload = self.backend.fetch_session(attempt_id).await?;
        let total = payload.questions.len();

        let (session, effects) = QuizSession::new(payload.attempt_id, self.settings.clone())
            .apply(
                SessionAction::Initialize {
                    questions: payload.questions,
                    time_limit_secs: payload.time_limit_secs,
                },
                self.clock.now(),
            )
            .into_parts();

        if let Some(err) = first_rejection(&effects) {
            warn!(attempt = %attempt_id, error = %err, "quiz session refused to start");
            return Err(err.into());
        }

        info!(
            attempt = %attempt_id,
            questions = total,
            time_limit_secs = payload.time_limit_secs,
            "quiz session started"
        );
        Ok(ActiveQuiz {
            clock: self.clock,
            backend: Arc::clone(&self.backend),
            session,
            ticker: None,
        })
    }
}

/// A running quiz: owns the session, its ticker, and the backend handle.
///
/// Every action takes `&mut self`, so two actions never overlap.
pub struct ActiveQuiz {
    clock: Clock,
    backend: Arc<dyn QuizBackend>,
    session: QuizSession,
    ticker: Option<Ticker>,
}

impl ActiveQuiz {
    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Start delivering one tick per second. Requires a tokio runtime.
    pub fn start_ticker(&mut self) {
        self.start_ticker_with_period(Duration::from_secs(1));
    }

    pub fn start_ticker_with_period(&mut self, period: Duration) {
        if self.session.status() == SessionStatus::Active {
            self.ticker = Some(Ticker::start(period));
        }
    }

    /// Wait for the next tick; `None` once the ticker is stopped or absent.
    pub async fn next_tick(&mut self) -> Option<()> {
        match self.ticker.as_mut() {
            Some(ticker) => ticker.next().await,
            None => None,
        }
    }

    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }

    pub fn select_answer(&mut self, answer: impl Into<String>) -> Vec<SessionEffect> {
        self.dispatch(SessionAction::SelectAnswer(answer.into()))
    }

    pub fn show_hint(&mut self) -> Vec<SessionEffect> {
        self.dispatch(SessionAction::ShowHint)
    }

    pub fn dismiss_hint(&mut self) -> Vec<SessionEffect> {
        self.dispatch(SessionAction::DismissHint)
    }

    pub fn dismiss_error(&mut self) -> Vec<SessionEffect> {
        self.dispatch(SessionAction::DismissError)
    }

    /// Submit the selected answer.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` if a resulting submission failed; the
    /// failure is also stored on the session as its submission error.
    pub async fn submit_answer(&mut self) -> Result<QuizUpdate, HostError> {
        self.run(SessionAction::SubmitAnswer).await
    }

    /// Advance the clocks by one second.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` if a timeout or expiry submission failed.
    pub async fn tick(&mut self) -> Result<QuizUpdate, HostError> {
        self.run(SessionAction::Tick).await
    }

    /// End the attempt now, submitting whatever was answered.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` if the final submission failed.
    pub async fn expire(&mut self) -> Result<QuizUpdate, HostError> {
        self.run(SessionAction::TimeExpire).await
    }

    /// Re-send the submission that last failed: the final set once the
    /// attempt has ended, otherwise the failed per-question answer.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` if the submission fails again.
    pub async fn retry_submission(&mut self) -> Result<QuizUpdate, HostError> {
        self.run(SessionAction::RetrySubmission).await
    }

    /// Leave the quiz, releasing its ticker.
    #[must_use]
    pub fn abandon(mut self) -> QuizSession {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        info!(
            attempt = %self.session.attempt_id(),
            status = ?self.session.status(),
            "quiz session abandoned"
        );
        self.session
    }

    fn dispatch(&mut self, action: SessionAction) -> Vec<SessionEffect> {
        let placeholder = QuizSession::new(
            self.session.attempt_id().clone(),
            self.session.settings().clone(),
        );
        let session = std::mem::replace(&mut self.session, placeholder);
        let (session, effects) = session.apply(action, self.clock.now()).into_parts();
        self.session = session;

        if self.session.status().is_terminal() {
            if let Some(ticker) = self.ticker.as_mut() {
                ticker.stop();
            }
        }
        effects
    }

    async fn run(&mut self, action: SessionAction) -> Result<QuizUpdate, HostError> {
        let mut effects = self.dispatch(action);
        let attempt_id = self.session.attempt_id().clone();
        let finishing = effects
            .iter()
            .any(|e| matches!(e, SessionEffect::Completed(_) | SessionEffect::Expired(_)));

        let mut pending: Option<Submission> = None;
        for effect in &effects {
            match effect {
                SessionEffect::ResponseRecorded(response)
                    if self.session.settings().persist_responses() && !finishing =>
                {
                    pending = Some(Submission::Response(ResponseSubmission::from(response)));
                }
                SessionEffect::ResponseRetried(response) => {
                    info!(attempt = %attempt_id, question = %response.question_id, "retrying response");
                    pending = Some(Submission::Response(ResponseSubmission::from(response)));
                }
                SessionEffect::Completed(set) => {
                    info!(attempt = %attempt_id, answered = set.len(), "quiz completed");
                    pending = Some(Submission::Final(set.clone()));
                }
                SessionEffect::Expired(set) => {
                    info!(attempt = %attempt_id, "quiz time expired");
                    pending = Some(Submission::Final(set.clone()));
                }
                SessionEffect::TimeWarning { remaining_secs } => {
                    warn!(attempt = %attempt_id, remaining_secs, "quiz time running out");
                }
                SessionEffect::QuestionTimedOut { question_id } => {
                    info!(attempt = %attempt_id, question = %question_id, "question timed out");
                }
                SessionEffect::Rejected(err) => {
                    warn!(attempt = %attempt_id, error = %err, "quiz action rejected");
                }
                _ => {}
            }
        }

        let Some(submission) = pending else {
            return Ok(QuizUpdate {
                effects,
                outcome: None,
            });
        };

        let outcome = match submission {
            Submission::Response(body) => {
                debug!(attempt = %attempt_id, question = %body.question_id, "persisting response");
                self.backend
                    .submit_response(&body)
                    .await
                    .map(|()| None)
                    .map_err(HostError::from)
            }
            Submission::Final(set) => self.submit_final(&attempt_id, set).await,
        };

        let settled = outcome.as_ref().map(|_| ()).map_err(ToString::to_string);
        effects.extend(self.dispatch(SessionAction::SubmissionSettled(settled)));

        match outcome {
            Ok(outcome) => Ok(QuizUpdate { effects, outcome }),
            Err(err) => {
                error!(attempt = %attempt_id, error = %err, "quiz submission failed");
                Err(err)
            }
        }
    }

    async fn submit_final(
        &self,
        attempt_id: &AttemptId,
        set: Vec<QuestionResponse>,
    ) -> Result<Option<QuizOutcome>, HostError> {
        let receipt = self.backend.submit_quiz(attempt_id, &set).await?;
        if !receipt.is_completed() {
            return Err(BackendError::Rejected(format!(
                "unexpected status {:?}",
                receipt.status
            ))
            .into());
        }

        let result = QuizResult::from_responses(self.session.questions(), set)
            .map_err(quiz_core::Error::from)?;
        info!(
            attempt = %attempt_id,
            score = result.score,
            points = result.points_earned,
            "quiz submission accepted"
        );
        Ok(Some(QuizOutcome {
            status: self.session.status(),
            receipt,
            result,
        }))
    }
}

enum Submission {
    Response(ResponseSubmission),
    Final(Vec<QuestionResponse>),
}

fn first_rejection(effects: &[SessionEffect]) -> Option<SessionError> {
    effects.iter().find_map(|effect| match effect {
        SessionEffect::Rejected(err) => Some(err.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use quiz_core::model::{Question, QuestionId};
    use quiz_core::time::fixed_clock;

    fn question(id: &str, correct: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["A".into(), "B".into()],
            correct,
            5,
        )
        .unwrap()
    }

    fn host(backend: &InMemoryBackend, settings: SessionSettings) -> QuizSessionHost {
        QuizSessionHost::new(fixed_clock(), Arc::new(backend.clone())).with_settings(settings)
    }

    #[tokio::test]
    async fn start_refuses_attempt_without_questions() {
        let backend = InMemoryBackend::new();
        let attempt = AttemptId::new("empty");
        backend.seed_session(attempt.clone(), Vec::new(), 60).unwrap();

        let err = host(&backend, SessionSettings::default())
            .start(&attempt)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HostError::Session(SessionError::NoQuestions)));
    }

    #[tokio::test]
    async fn incremental_persistence_posts_each_answer() {
        let backend = InMemoryBackend::new();
        let attempt = AttemptId::new("att");
        backend
            .seed_session(attempt.clone(), vec![question("q1", "A"), question("q2", "B")], 60)
            .unwrap();
        let settings = SessionSettings::default().with_persist_responses(true);
        let mut quiz = host(&backend, settings).start(&attempt).await.unwrap();

        quiz.select_answer("A");
        let update = quiz.submit_answer().await.unwrap();
        assert!(update.outcome.is_none());
        assert!(!quiz.session().is_submitting());
        assert_eq!(backend.recorded_responses().unwrap().len(), 1);

        quiz.select_answer("A");
        let update = quiz.submit_answer().await.unwrap();
        let outcome = update.outcome.unwrap();
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.result.points_earned, 5);
        assert_eq!(outcome.result.points_possible, 10);
        // The final set carries the last answer.
        assert_eq!(backend.recorded_responses().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_incremental_post_is_surfaced_and_session_moves_on() {
        let backend = InMemoryBackend::new();
        let attempt = AttemptId::new("att");
        backend
            .seed_session(attempt.clone(), vec![question("q1", "A"), question("q2", "B")], 60)
            .unwrap();
        backend.fail_next_responses(1).unwrap();
        let settings = SessionSettings::default().with_persist_responses(true);
        let mut quiz = host(&backend, settings).start(&attempt).await.unwrap();

        quiz.select_answer("A");
        let err = quiz.submit_answer().await.err().unwrap();
        assert!(matches!(err, HostError::Backend(BackendError::Unavailable(_))));
        assert_eq!(quiz.session().current_index(), 1);
        assert!(!quiz.session().is_submitting());
        assert!(quiz.session().submission_error().is_some());

        quiz.dismiss_error();
        assert!(quiz.session().submission_error().is_none());
        assert!(backend.recorded_responses().unwrap().is_empty());

        let update = quiz.retry_submission().await.unwrap();
        assert!(update.rejection().is_none());
        assert!(!quiz.session().is_submitting());
        let posted = backend.recorded_responses().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].question_id, QuestionId::new("q1"));
        assert_eq!(posted[0].student_answer, "A");
    }

    #[tokio::test]
    async fn abandon_stops_the_ticker() {
        let backend = InMemoryBackend::new();
        let attempt = AttemptId::new("att");
        backend
            .seed_session(attempt.clone(), vec![question("q1", "A")], 60)
            .unwrap();
        let mut quiz = host(&backend, SessionSettings::default())
            .start(&attempt)
            .await
            .unwrap();
        quiz.start_ticker();
        assert!(quiz.is_ticking());

        let session = quiz.abandon();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(backend.submit_calls().unwrap(), 0);
    }
}
