use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

use quiz_core::model::{
    AttemptId, Question, QuestionId, QuestionResponse, SessionSettings, TimerScope,
};
use quiz_core::recorder::ResponseRecorder;
use quiz_core::time::elapsed_secs;
use quiz_core::{Countdown, TimerEvent};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATUS / ACTIONS / EFFECTS ────────────────────────────────────────────────
//

/// Lifecycle of a quiz session. `Completed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Active,
    Completed,
    Expired,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Expired)
    }
}

/// Inputs accepted by [`QuizSession::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Initialize {
        questions: Vec<Question>,
        time_limit_secs: u32,
    },
    SelectAnswer(String),
    SubmitAnswer,
    /// One second of wall-clock time elapsed.
    Tick,
    /// The attempt-wide time is up, regardless of the countdown.
    TimeExpire,
    ShowHint,
    DismissHint,
    /// Outcome of the host's asynchronous submission, `Err` carrying a user-facing message.
    SubmissionSettled(Result<(), String>),
    DismissError,
    RetrySubmission,
}

/// Outputs of a transition, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    Started { total_questions: usize },
    ResponseRecorded(QuestionResponse),
    /// A per-question submission that failed earlier, handed over again.
    ResponseRetried(QuestionResponse),
    Advanced { index: usize },
    QuestionTimedOut { question_id: QuestionId },
    TimeWarning { remaining_secs: u32 },
    /// All questions answered; the ordered final set for submission.
    Completed(Vec<QuestionResponse>),
    /// Time ran out; the ordered final set with unanswered entries left empty.
    Expired(Vec<QuestionResponse>),
    Rejected(SessionError),
    Ignored,
}

/// The session after a transition plus what the transition produced.
#[must_use]
#[derive(Debug)]
pub struct Transition {
    pub session: QuizSession,
    pub effects: Vec<SessionEffect>,
}

impl Transition {
    /// The first rejection, if the action was refused.
    #[must_use]
    pub fn rejection(&self) -> Option<&SessionError> {
        self.effects.iter().find_map(|effect| match effect {
            SessionEffect::Rejected(err) => Some(err),
            _ => None,
        })
    }

    /// The final response set, if this transition finished the attempt.
    #[must_use]
    pub fn final_responses(&self) -> Option<&[QuestionResponse]> {
        self.effects.iter().find_map(|effect| match effect {
            SessionEffect::Completed(set) | SessionEffect::Expired(set) => Some(set.as_slice()),
            _ => None,
        })
    }

    #[must_use]
    pub fn into_parts(self) -> (QuizSession, Vec<SessionEffect>) {
        (self.session, self.effects)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one quiz attempt.
///
/// Every transition consumes the session and hands back the next one inside a
/// [`Transition`]; nothing else mutates it. Traversal is strictly forward.
pub struct QuizSession {
    attempt_id: AttemptId,
    settings: SessionSettings,
    status: SessionStatus,
    questions: Vec<Question>,
    current: usize,
    quiz_timer: Countdown,
    question_timer: Countdown,
    recorder: ResponseRecorder,
    selected: Option<String>,
    show_hint: bool,
    submitting: bool,
    submission_error: Option<String>,
    /// Answer whose per-question submission is pending.
    in_flight_response: Option<QuestionResponse>,
    /// Answer whose per-question submission last failed.
    failed_response: Option<QuestionResponse>,
    final_failed: bool,
    presented_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    final_set: Option<Vec<QuestionResponse>>,
}

impl QuizSession {
    /// Create an uninitialized session for `attempt_id`.
    #[must_use]
    pub fn new(attempt_id: AttemptId, settings: SessionSettings) -> Self {
        Self {
            recorder: ResponseRecorder::new(attempt_id.clone()),
            attempt_id,
            settings,
            status: SessionStatus::Uninitialized,
            questions: Vec::new(),
            current: 0,
            quiz_timer: Countdown::idle(),
            question_timer: Countdown::idle(),
            selected: None,
            show_hint: false,
            submitting: false,
            submission_error: None,
            in_flight_response: None,
            failed_response: None,
            final_failed: false,
            presented_at: None,
            started_at: None,
            finished_at: None,
            final_set: None,
        }
    }

    /// Apply one action. `now` is the wall-clock time the action happened.
    pub fn apply(mut self, action: SessionAction, now: DateTime<Utc>) -> Transition {
        let mut effects = Vec::new();
        match action {
            SessionAction::Initialize {
                questions,
                time_limit_secs,
            } => self.initialize(questions, time_limit_secs, now, &mut effects),
            SessionAction::SelectAnswer(answer) => self.select_answer(answer, &mut effects),
            SessionAction::SubmitAnswer => self.submit_answer(now, &mut effects),
            SessionAction::Tick => self.tick(now, &mut effects),
            SessionAction::TimeExpire => self.expire(now, &mut effects),
            SessionAction::ShowHint => self.set_hint(true, &mut effects),
            SessionAction::DismissHint => self.set_hint(false, &mut effects),
            SessionAction::SubmissionSettled(result) => self.settle(result, &mut effects),
            SessionAction::DismissError => self.submission_error = None,
            SessionAction::RetrySubmission => self.retry_submission(&mut effects),
        }
        Transition {
            session: self,
            effects,
        }
    }

    // ─── transitions ─────────────────────────────────────────────────────────

    fn initialize(
        &mut self,
        questions: Vec<Question>,
        time_limit_secs: u32,
        now: DateTime<Utc>,
        effects: &mut Vec<SessionEffect>,
    ) {
        if self.status != SessionStatus::Uninitialized {
            effects.push(SessionEffect::Rejected(SessionError::AlreadyStarted));
            return;
        }
        if questions.is_empty() {
            effects.push(SessionEffect::Rejected(SessionError::NoQuestions));
            return;
        }
        if self.attempt_id.is_blank() {
            effects.push(SessionEffect::Rejected(SessionError::MissingAttemptId));
            return;
        }
        let duplicate = {
            let mut seen = HashSet::with_capacity(questions.len());
            questions
                .iter()
                .map(Question::id)
                .find(|id| !seen.insert(*id))
                .cloned()
        };
        if let Some(id) = duplicate {
            effects.push(SessionEffect::Rejected(SessionError::DuplicateQuestion(id)));
            return;
        }

        self.questions = questions;
        self.current = 0;
        self.recorder.clear();
        self.selected = None;
        self.show_hint = false;
        self.quiz_timer.start(time_limit_secs);
        self.load_question_timer();
        self.presented_at = Some(now);
        self.started_at = Some(now);
        self.status = SessionStatus::Active;
        effects.push(SessionEffect::Started {
            total_questions: self.questions.len(),
        });
    }

    fn select_answer(&mut self, answer: String, effects: &mut Vec<SessionEffect>) {
        if self.status != SessionStatus::Active {
            effects.push(SessionEffect::Rejected(SessionError::NotActive));
            return;
        }
        self.selected = if answer.is_empty() { None } else { Some(answer) };
        self.submission_error = None;
    }

    fn submit_answer(&mut self, now: DateTime<Utc>, effects: &mut Vec<SessionEffect>) {
        if self.status != SessionStatus::Active {
            effects.push(SessionEffect::Rejected(SessionError::NotActive));
            return;
        }
        if self.submitting {
            effects.push(SessionEffect::Ignored);
            return;
        }
        let Some(answer) = self.selected.take() else {
            effects.push(SessionEffect::Rejected(SessionError::NoAnswerSelected));
            return;
        };

        self.record_current(Some(&answer), now, effects);
        self.finish_question(now, effects);
    }

    fn tick(&mut self, now: DateTime<Utc>, effects: &mut Vec<SessionEffect>) {
        if self.status != SessionStatus::Active {
            effects.push(SessionEffect::Ignored);
            return;
        }

        match self.quiz_timer.tick() {
            Some(TimerEvent::Expired) => {
                self.expire(now, effects);
                return;
            }
            Some(TimerEvent::Tick(remaining)) => {
                if self.settings.warning_thresholds_secs().contains(&remaining) {
                    effects.push(SessionEffect::TimeWarning {
                        remaining_secs: remaining,
                    });
                }
            }
            None => {}
        }

        if self.question_timer.tick() == Some(TimerEvent::Expired) {
            if let Some(question) = self.current_question() {
                effects.push(SessionEffect::QuestionTimedOut {
                    question_id: question.id().clone(),
                });
            }
            // Timeouts submit an empty answer and bypass the in-flight guard.
            self.selected = None;
            self.record_current(None, now, effects);
            self.finish_question(now, effects);
        }
    }

    fn expire(&mut self, now: DateTime<Utc>, effects: &mut Vec<SessionEffect>) {
        if self.status != SessionStatus::Active {
            effects.push(SessionEffect::Ignored);
            return;
        }
        if let Some(answer) = self.selected.take() {
            self.record_current(Some(&answer), now, effects);
        }

        // Whatever exists is handed over, even if the set would not pass validation.
        let set = self.recorder.complete_set(&self.questions, now);
        self.stop_timers();
        self.show_hint = false;
        self.status = SessionStatus::Expired;
        self.finished_at = Some(now);
        self.hand_over(set.clone());
        effects.push(SessionEffect::Expired(set));
    }

    fn set_hint(&mut self, visible: bool, effects: &mut Vec<SessionEffect>) {
        if self.status != SessionStatus::Active || self.submitting {
            effects.push(SessionEffect::Ignored);
            return;
        }
        self.show_hint = visible;
    }

    fn settle(&mut self, result: Result<(), String>, effects: &mut Vec<SessionEffect>) {
        if !self.submitting {
            effects.push(SessionEffect::Ignored);
            return;
        }
        self.submitting = false;
        let response = self.in_flight_response.take();
        match result {
            Ok(()) => self.final_failed = false,
            Err(message) => {
                if self.status.is_terminal() {
                    self.final_failed = true;
                } else {
                    self.failed_response = response;
                }
                self.submission_error = Some(message);
            }
        }
    }

    fn retry_submission(&mut self, effects: &mut Vec<SessionEffect>) {
        if self.submitting {
            effects.push(SessionEffect::Rejected(SessionError::NothingToRetry));
            return;
        }

        if self.status.is_terminal() && self.final_failed {
            if let Some(set) = self.final_set.clone() {
                self.final_failed = false;
                self.submission_error = None;
                self.submitting = true;
                effects.push(match self.status {
                    SessionStatus::Expired => SessionEffect::Expired(set),
                    _ => SessionEffect::Completed(set),
                });
                return;
            }
        }

        if self.status == SessionStatus::Active {
            if let Some(response) = self.failed_response.take() {
                self.submission_error = None;
                self.submitting = true;
                self.in_flight_response = Some(response.clone());
                effects.push(SessionEffect::ResponseRetried(response));
                return;
            }
        }

        effects.push(SessionEffect::Rejected(SessionError::NothingToRetry));
    }

    /// Arm the guard for the final submission; it carries every answer.
    fn hand_over(&mut self, set: Vec<QuestionResponse>) {
        self.submitting = true;
        self.final_failed = false;
        self.in_flight_response = None;
        self.failed_response = None;
        self.final_set = Some(set);
    }

    // ─── helpers ─────────────────────────────────────────────────────────────

    fn record_current(
        &mut self,
        answer: Option<&str>,
        now: DateTime<Utc>,
        effects: &mut Vec<SessionEffect>,
    ) {
        let Some(question) = self.questions.get(self.current) else {
            return;
        };
        let time_taken = self
            .presented_at
            .map_or(0, |presented| elapsed_secs(presented, now));
        let response = self.recorder.record(question, answer, time_taken, now).clone();
        if self.settings.persist_responses() {
            self.submitting = true;
            self.in_flight_response = Some(response.clone());
        }
        effects.push(SessionEffect::ResponseRecorded(response));
    }

    fn finish_question(&mut self, now: DateTime<Utc>, effects: &mut Vec<SessionEffect>) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selected = None;
            self.show_hint = false;
            self.presented_at = Some(now);
            self.load_question_timer();
            effects.push(SessionEffect::Advanced {
                index: self.current,
            });
            return;
        }

        let set = self.recorder.complete_set(&self.questions, now);
        if let Err(err) = ResponseRecorder::validate_complete(&self.questions, &set) {
            // Stay on the last question; a re-submit replaces the entry.
            effects.push(SessionEffect::Rejected(err.into()));
            return;
        }

        self.stop_timers();
        self.selected = None;
        self.show_hint = false;
        self.status = SessionStatus::Completed;
        self.finished_at = Some(now);
        self.hand_over(set.clone());
        effects.push(SessionEffect::Completed(set));
    }

    fn load_question_timer(&mut self) {
        let allotment = match self.settings.timer_scope() {
            TimerScope::PerQuestion => self
                .questions
                .get(self.current)
                .and_then(Question::time_allotment_secs),
            TimerScope::QuizWide => None,
        };
        match allotment {
            Some(secs) => self.question_timer.reset(secs),
            None => self.question_timer.stop(),
        }
    }

    fn stop_timers(&mut self) {
        self.quiz_timer.stop();
        self.question_timer.stop();
    }

    // ─── accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn attempt_id(&self) -> &AttemptId {
        &self.attempt_id
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Total number of questions in this session.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen, while the session is active.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.status == SessionStatus::Active {
            self.questions.get(self.current)
        } else {
            None
        }
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn is_hint_visible(&self) -> bool {
        self.show_hint
    }

    /// Hint for the current question, falling back to its misconception note.
    #[must_use]
    pub fn hint_text(&self) -> Option<&str> {
        self.current_question().and_then(Question::hint_text)
    }

    /// True while an asynchronous submission is pending.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[must_use]
    pub fn submission_error(&self) -> Option<&str> {
        self.submission_error.as_deref()
    }

    #[must_use]
    pub fn quiz_remaining_secs(&self) -> u32 {
        self.quiz_timer.remaining()
    }

    /// Seconds left on the current question's own countdown, if it has one.
    #[must_use]
    pub fn question_remaining_secs(&self) -> Option<u32> {
        self.question_timer
            .is_running()
            .then(|| self.question_timer.remaining())
    }

    /// Responses recorded so far, in recording order.
    #[must_use]
    pub fn responses(&self) -> &[QuestionResponse] {
        self.recorder.responses()
    }

    /// The set handed over on completion or expiry.
    #[must_use]
    pub fn final_responses(&self) -> Option<&[QuestionResponse]> {
        self.final_set.as_deref()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.recorder.len();
        let percent = if total == 0 {
            0.0
        } else if self.status.is_terminal() {
            100.0
        } else {
            self.current as f64 / total as f64 * 100.0
        };
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            current_index: self.current,
            percent,
            is_complete: self.status.is_terminal(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("attempt_id", &self.attempt_id)
            .field("status", &self.status)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("responses_len", &self.recorder.len())
            .field("quiz_remaining", &self.quiz_timer.remaining())
            .field("submitting", &self.submitting)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
