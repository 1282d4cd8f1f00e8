use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least 2 options, found {found}")]
    TooFewOptions { found: usize },

    #[error("correct answer index {index} is out of range for {options} options")]
    CorrectAnswerOutOfRange { index: usize, options: usize },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Authored shape of a single quiz question, prior to validation.
///
/// Content comes from the module authors as data; `correct_answer_index`
/// uses the camel-cased key of the original content format.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: Option<QuestionId>,
    pub text: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswerIndex")]
    pub correct_answer_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text is empty, fewer than two
    /// options were authored, or the correct-answer index does not point
    /// into the option list.
    pub fn validate(self) -> Result<Question, QuestionError> {
        Question::new(
            self.id,
            self.text,
            self.options,
            self.correct_answer_index,
            self.explanation,
        )
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single-select quiz question.
///
/// Option order is significant: it is the display order and the index
/// space of `correct_answer`. Exactly one option is correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: Option<QuestionId>,
    text: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: Option<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` for a blank prompt,
    /// `QuestionError::TooFewOptions` for fewer than two options, and
    /// `QuestionError::CorrectAnswerOutOfRange` when `correct_answer`
    /// does not index into `options`.
    pub fn new(
        id: Option<QuestionId>,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                found: options.len(),
            });
        }
        if correct_answer >= options.len() {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                index: correct_answer,
                options: options.len(),
            });
        }

        Ok(Self {
            id,
            text,
            options,
            correct_answer,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> Option<&QuestionId> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Options in authored order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Whether the given option index is the correct one.
    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
