use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {0} has no prompt text")]
    EmptyText(QuestionId),

    #[error("question {0} has no answer options")]
    NoOptions(QuestionId),

    #[error("question {0} has no correct answer")]
    MissingCorrectAnswer(QuestionId),
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    TrueFalse,
    Matching,
}

//
// ─── WIRE RECORD ───────────────────────────────────────────────────────────────
//

/// JSON shape of a question as delivered by the quiz backend.
///
/// Converted into a validated [`Question`] before it enters a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question_id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub points: u32,
    /// Per-question time allotment in seconds.
    #[serde(default, rename = "time_estimate")]
    pub time_allotment_secs: Option<u32>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub misconception: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, rename = "type")]
    pub question_type: QuestionType,
}

impl QuestionRecord {
    /// Validate the record into an immutable [`Question`].
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id, text, options, or correct answer are blank.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.question_id.is_blank() {
            return Err(QuestionError::EmptyId);
        }
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText(self.question_id));
        }
        if self.options.iter().all(|o| o.trim().is_empty()) {
            return Err(QuestionError::NoOptions(self.question_id));
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionError::MissingCorrectAnswer(self.question_id));
        }

        Ok(Question {
            id: self.question_id,
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
            points: self.points,
            time_allotment_secs: self.time_allotment_secs,
            hint: normalize_optional(self.hint),
            misconception: normalize_optional(self.misconception),
            explanation: normalize_optional(self.explanation),
            difficulty: self.difficulty,
            question_type: self.question_type,
        })
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single quiz question. Immutable once loaded into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    points: u32,
    time_allotment_secs: Option<u32>,
    hint: Option<String>,
    misconception: Option<String>,
    explanation: Option<String>,
    difficulty: Difficulty,
    question_type: QuestionType,
}

impl Question {
    /// Creates a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if any required field is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        points: u32,
    ) -> Result<Self, QuestionError> {
        QuestionRecord {
            question_id: id,
            text: text.into(),
            options,
            correct_answer: correct_answer.into(),
            points,
            time_allotment_secs: None,
            hint: None,
            misconception: None,
            explanation: None,
            difficulty: Difficulty::default(),
            question_type: QuestionType::default(),
        }
        .validate()
    }

    #[must_use]
    pub fn with_time_allotment(mut self, secs: u32) -> Self {
        self.time_allotment_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = normalize_optional(Some(hint.into()));
        self
    }

    #[must_use]
    pub fn with_misconception(mut self, text: impl Into<String>) -> Self {
        self.misconception = normalize_optional(Some(text.into()));
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn time_allotment_secs(&self) -> Option<u32> {
        self.time_allotment_secs
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    #[must_use]
    pub fn misconception(&self) -> Option<&str> {
        self.misconception.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    /// Text shown when the student asks for a hint.
    ///
    /// Falls back to the misconception note when no explicit hint exists.
    #[must_use]
    pub fn hint_text(&self) -> Option<&str> {
        self.hint().or_else(|| self.misconception())
    }

    /// True when `answer` matches the designated correct option exactly.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        !answer.is_empty() && answer == self.correct_answer
    }

    /// Convert back into the wire shape.
    #[must_use]
    pub fn to_record(&self) -> QuestionRecord {
        QuestionRecord {
            question_id: self.id.clone(),
            text: self.text.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
            points: self.points,
            time_allotment_secs: self.time_allotment_secs,
            hint: self.hint.clone(),
            misconception: self.misconception.clone(),
            explanation: self.explanation.clone(),
            difficulty: self.difficulty,
            question_type: self.question_type,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
