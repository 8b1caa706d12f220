use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::Question;
use crate::model::response::QuestionResponse;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("too many responses for a single attempt: {len}")]
    TooManyResponses { len: usize },
}

/// Aggregate counters shown next to the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizStatistics {
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Mean of `time_taken` over all responses, in seconds.
    pub avg_time_per_question: f64,
}

/// Tabulated outcome of a finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    /// Earned points as a percentage of possible points, one decimal place.
    pub score: f64,
    pub statistics: QuizStatistics,
    pub responses: Vec<QuestionResponse>,
    #[serde(default)]
    pub points_earned: u32,
    #[serde(default)]
    pub points_possible: u32,
}

impl QuizResult {
    /// Tabulate a finished response set against the attempt's questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizResultError::TooManyResponses` if the count cannot fit in `u32`.
    pub fn from_responses(
        questions: &[Question],
        responses: Vec<QuestionResponse>,
    ) -> Result<Self, QuizResultError> {
        let total_questions = u32::try_from(responses.len())
            .map_err(|_| QuizResultError::TooManyResponses {
                len: responses.len(),
            })?;

        let mut correct_answers = 0_u32;
        let mut points_earned = 0_u32;
        let mut total_time = 0_u64;
        for response in &responses {
            if response.is_correct {
                correct_answers = correct_answers.saturating_add(1);
            }
            points_earned = points_earned.saturating_add(response.points_earned);
            total_time += u64::from(response.time_taken);
        }

        let points_possible = questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points()));

        let avg_time_per_question = if responses.is_empty() {
            0.0
        } else {
            total_time as f64 / responses.len() as f64
        };

        Ok(Self {
            score: percentage(points_earned, points_possible),
            statistics: QuizStatistics {
                total_questions,
                correct_answers,
                avg_time_per_question,
            },
            responses,
            points_earned,
            points_possible,
        })
    }
}

fn percentage(earned: u32, possible: u32) -> f64 {
    if possible == 0 {
        return 0.0;
    }
    let raw = f64::from(earned) / f64::from(possible) * 100.0;
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::{AttemptId, QuestionId};
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
    fn scores_two_of_three_as_rounded_percentage() {
        let questions = vec![question("q1", "A"), question("q2", "B"), question("q3", "C")];
        let attempt = AttemptId::new("att");
        let now = fixed_now();
        let responses = vec![
            QuestionResponse::evaluate(attempt.clone(), &questions[0], Some("A"), 4, now),
            QuestionResponse::evaluate(attempt.clone(), &questions[1], None, 6, now),
            QuestionResponse::evaluate(attempt, &questions[2], Some("C"), 5, now),
        ];

        let result = QuizResult::from_responses(&questions, responses).unwrap();

        assert_eq!(result.points_earned, 20);
        assert_eq!(result.points_possible, 30);
        assert!((result.score - 66.7).abs() < f64::EPSILON);
        assert_eq!(result.statistics.total_questions, 3);
        assert_eq!(result.statistics.correct_answers, 2);
        assert!((result.statistics.avg_time_per_question - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_attempt_scores_zero() {
        let result = QuizResult::from_responses(&[], Vec::new()).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.statistics.avg_time_per_question, 0.0);
    }
}
