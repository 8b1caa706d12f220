//! Per-attempt response bookkeeping.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{AttemptId, Question, QuestionId, QuestionResponse};

/// Reasons a response set may not be submitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseSetError {
    #[error("more than one response for question {0}")]
    DuplicateQuestion(QuestionId),

    #[error("response #{index} has no question id")]
    MissingQuestionId { index: usize },

    #[error("response #{index} has no attempt id")]
    MissingAttemptId { index: usize },

    #[error("no response for question {0}")]
    MissingResponse(QuestionId),

    #[error("response for unknown question {0}")]
    UnknownQuestion(QuestionId),
}

/// Accumulates one response per question for a single attempt.
///
/// Recording a question twice replaces the earlier entry in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecorder {
    attempt_id: AttemptId,
    responses: Vec<QuestionResponse>,
}

impl ResponseRecorder {
    #[must_use]
    pub fn new(attempt_id: AttemptId) -> Self {
        Self {
            attempt_id,
            responses: Vec::new(),
        }
    }

    #[must_use]
    pub fn attempt_id(&self) -> &AttemptId {
        &self.attempt_id
    }

    /// Grade and store an answer for `question`.
    ///
    /// `None` or an empty answer is stored as `""` and is never correct.
    pub fn record(
        &mut self,
        question: &Question,
        answer: Option<&str>,
        time_taken: u32,
        now: DateTime<Utc>,
    ) -> &QuestionResponse {
        let response =
            QuestionResponse::evaluate(self.attempt_id.clone(), question, answer, time_taken, now);

        let slot = match self
            .responses
            .iter()
            .position(|r| r.question_id == response.question_id)
        {
            Some(index) => {
                self.responses[index] = response;
                index
            }
            None => {
                self.responses.push(response);
                self.responses.len() - 1
            }
        };
        &self.responses[slot]
    }

    /// Responses in the order they were first recorded.
    #[must_use]
    pub fn responses(&self) -> &[QuestionResponse] {
        &self.responses
    }

    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> Option<&QuestionResponse> {
        self.responses.iter().find(|r| &r.question_id == question_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn clear(&mut self) {
        self.responses.clear();
    }

    /// Ordered final set: one entry per question, in question order.
    ///
    /// Questions without a recorded answer get an empty response with zero time.
    #[must_use]
    pub fn complete_set(&self, questions: &[Question], now: DateTime<Utc>) -> Vec<QuestionResponse> {
        questions
            .iter()
            .map(|question| match self.get(question.id()) {
                Some(existing) => existing.clone(),
                None => {
                    QuestionResponse::evaluate(self.attempt_id.clone(), question, None, 0, now)
                }
            })
            .collect()
    }

    /// Pre-submission gate for a response set.
    ///
    /// # Errors
    ///
    /// Returns `ResponseSetError` on a blank question/attempt id or a duplicated question.
    pub fn validate(responses: &[QuestionResponse]) -> Result<(), ResponseSetError> {
        let mut seen = HashSet::with_capacity(responses.len());
        for (index, response) in responses.iter().enumerate() {
            if response.question_id.is_blank() {
                return Err(ResponseSetError::MissingQuestionId { index });
            }
            if response.attempt_id.is_blank() {
                return Err(ResponseSetError::MissingAttemptId { index });
            }
            if !seen.insert(&response.question_id) {
                return Err(ResponseSetError::DuplicateQuestion(
                    response.question_id.clone(),
                ));
            }
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus exact coverage of `questions`.
    ///
    /// # Errors
    ///
    /// Returns `ResponseSetError` if the set is invalid, misses a question, or
    /// answers a question that is not part of the attempt.
    pub fn validate_complete(
        questions: &[Question],
        responses: &[QuestionResponse],
    ) -> Result<(), ResponseSetError> {
        Self::validate(responses)?;

        let expected: HashSet<&QuestionId> = questions.iter().map(Question::id).collect();
        if let Some(stray) = responses
            .iter()
            .find(|r| !expected.contains(&r.question_id))
        {
            return Err(ResponseSetError::UnknownQuestion(stray.question_id.clone()));
        }

        let answered: HashSet<&QuestionId> = responses.iter().map(|r| &r.question_id).collect();
        if let Some(missing) = questions.iter().find(|q| !answered.contains(q.id())) {
            return Err(ResponseSetError::MissingResponse(missing.id().clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question(id: &str, correct: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["A".into(), "B".into(), "C".into()],
            correct,
            10,
        )
        .unwrap()
    }

    #[test]
    fn record_replaces_existing_entry_in_place() {
        let q1 = question("q1", "A");
        let q2 = question("q2", "B");
        let mut recorder = ResponseRecorder::new(AttemptId::new("att"));

        recorder.record(&q1, Some("C"), 3, fixed_now());
        recorder.record(&q2, Some("B"), 4, fixed_now());
        let replaced = recorder.record(&q1, Some("A"), 9, fixed_now());
        assert!(replaced.is_correct);

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.responses()[0].question_id, QuestionId::new("q1"));
        assert_eq!(recorder.responses()[0].time_taken, 9);
        assert_eq!(recorder.responses()[1].question_id, QuestionId::new("q2"));
    }

    #[test]
    fn empty_answer_is_recorded_as_incorrect() {
        let q = question("q1", "A");
        let mut recorder = ResponseRecorder::new(AttemptId::new("att"));
        let r = recorder.record(&q, Some(""), 0, fixed_now());
        assert_eq!(r.student_answer, "");
        assert!(!r.is_correct);
        assert_eq!(r.points_earned, 0);
    }

    #[test]
    fn validate_rejects_duplicates_and_blank_ids() {
        let q = question("q1", "A");
        let now = fixed_now();
        let first = QuestionResponse::evaluate(AttemptId::new("att"), &q, Some("A"), 1, now);
        let dup = QuestionResponse::evaluate(AttemptId::new("att"), &q, Some("B"), 1, now);

        let err = ResponseRecorder::validate(&[first.clone(), dup]).unwrap_err();
        assert_eq!(err, ResponseSetError::DuplicateQuestion(QuestionId::new("q1")));

        let mut blank_attempt = first.clone();
        blank_attempt.attempt_id = AttemptId::new("");
        let err = ResponseRecorder::validate(&[blank_attempt]).unwrap_err();
        assert_eq!(err, ResponseSetError::MissingAttemptId { index: 0 });

        let mut blank_question = first;
        blank_question.question_id = QuestionId::new(" ");
        let err = ResponseRecorder::validate(&[blank_question]).unwrap_err();
        assert_eq!(err, ResponseSetError::MissingQuestionId { index: 0 });
    }

    #[test]
    fn complete_set_fills_gaps_in_question_order() {
        let questions = vec![question("q1", "A"), question("q2", "B"), question("q3", "C")];
        let mut recorder = ResponseRecorder::new(AttemptId::new("att"));
        recorder.record(&questions[2], Some("C"), 5, fixed_now());

        let set = recorder.complete_set(&questions, fixed_now());

        let ids: Vec<_> = set.iter().map(|r| r.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
        assert!(set[0].is_unanswered());
        assert!(set[1].is_unanswered());
        assert!(set[2].is_correct);
        assert!(ResponseRecorder::validate_complete(&questions, &set).is_ok());
    }

    #[test]
    fn validate_complete_reports_missing_question() {
        let questions = vec![question("q1", "A"), question("q2", "B")];
        let mut recorder = ResponseRecorder::new(AttemptId::new("att"));
        recorder.record(&questions[0], Some("A"), 1, fixed_now());

        let err =
            ResponseRecorder::validate_complete(&questions, recorder.responses()).unwrap_err();
        assert_eq!(err, ResponseSetError::MissingResponse(QuestionId::new("q2")));
    }
}
