use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, QuestionId, ResponseId};
use crate::model::question::Question;

/// Feedback text shown for a correct answer.
pub const CORRECT_FEEDBACK: &str = "Correct!";

/// Recorded outcome of a student's answer to one question.
///
/// An empty `student_answer` marks a question left unanswered (timeout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub response_id: ResponseId,
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
    pub student_answer: String,
    pub is_correct: bool,
    /// Whole seconds spent on the question.
    pub time_taken: u32,
    pub points_earned: u32,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

impl QuestionResponse {
    /// Grade `answer` against `question`.
    ///
    /// `None` and `""` both record an empty, incorrect answer.
    #[must_use]
    pub fn evaluate(
        attempt_id: AttemptId,
        question: &Question,
        answer: Option<&str>,
        time_taken: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        let student_answer = answer.unwrap_or_default().to_string();
        let is_correct = question.is_correct(&student_answer);
        Self {
            response_id: ResponseId::generate(),
            attempt_id,
            question_id: question.id().clone(),
            student_answer,
            is_correct,
            time_taken,
            points_earned: if is_correct { question.points() } else { 0 },
            feedback: feedback_for(question, is_correct),
            created_at,
        }
    }

    /// True when the student left the question unanswered.
    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        self.student_answer.is_empty()
    }
}

fn feedback_for(question: &Question, is_correct: bool) -> String {
    if is_correct {
        CORRECT_FEEDBACK.to_string()
    } else {
        format!(
            "Incorrect. The correct answer is \"{}\"",
            question.correct_answer()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question() -> Question {
        Question::new(
            QuestionId::new("q1"),
            "Pick B",
            vec!["A".into(), "B".into()],
            "B",
            10,
        )
        .unwrap()
    }

    #[test]
    fn correct_answer_earns_points() {
        let r = QuestionResponse::evaluate(
            AttemptId::new("att-1"),
            &question(),
            Some("B"),
            12,
            fixed_now(),
        );
        assert!(r.is_correct);
        assert_eq!(r.points_earned, 10);
        assert_eq!(r.feedback, CORRECT_FEEDBACK);
        assert_eq!(r.time_taken, 12);
    }

    #[test]
    fn wrong_answer_names_correct_option() {
        let r = QuestionResponse::evaluate(
            AttemptId::new("att-1"),
            &question(),
            Some("A"),
            3,
            fixed_now(),
        );
        assert!(!r.is_correct);
        assert_eq!(r.points_earned, 0);
        assert_eq!(r.feedback, "Incorrect. The correct answer is \"B\"");
    }

    #[test]
    fn missing_answer_is_recorded_empty() {
        let r = QuestionResponse::evaluate(
            AttemptId::new("att-1"),
            &question(),
            None,
            0,
            fixed_now(),
        );
        assert!(r.is_unanswered());
        assert!(!r.is_correct);
        assert_eq!(r.points_earned, 0);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let r = QuestionResponse::evaluate(
            AttemptId::new("att-1"),
            &question(),
            Some("B"),
            7,
            fixed_now(),
        );
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["question_id"], "q1");
        assert_eq!(value["attempt_id"], "att-1");
        assert_eq!(value["student_answer"], "B");
        assert_eq!(value["points_earned"], 10);
    }
}
