use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    Empty,

    #[error("question {index}: {source}")]
    Question {
        index: usize,
        source: QuestionError,
    },

    #[error("quiz content is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Authored shape of a quiz.
///
/// Two legacy shapes exist in module content: a bare question array and a
/// wrapper object with a `questions` field. Both deserialize into this
/// enum and normalize to one canonical `Quiz`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuizDraft {
    Bare(Vec<QuestionDraft>),
    Wrapped { questions: Vec<QuestionDraft> },
}

impl QuizDraft {
    /// The ordered question drafts, regardless of authored shape.
    #[must_use]
    pub fn into_questions(self) -> Vec<QuestionDraft> {
        match self {
            QuizDraft::Bare(questions) | QuizDraft::Wrapped { questions } => questions,
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A validated, non-empty ordered question list for one module quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    questions: Vec<Question>,
}

impl Quiz {
    /// Build a quiz from already-validated questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` when no questions are given.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self { questions })
    }

    /// Normalize an authored draft into a quiz, validating every question.
    ///
    /// Malformed content fails here, at load time, rather than producing
    /// undefined scoring later.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` for an empty question list and
    /// `QuizError::Question` for the first invalid question.
    pub fn from_draft(draft: QuizDraft) -> Result<Self, QuizError> {
        let questions = draft
            .into_questions()
            .into_iter()
            .enumerate()
            .map(|(index, q)| {
                q.validate()
                    .map_err(|source| QuizError::Question { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    /// Load a quiz from authored JSON content (either legacy shape).
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Parse` for malformed JSON and the `from_draft`
    /// errors for invalid content.
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        let draft: QuizDraft = serde_json::from_str(json)?;
        Self::from_draft(draft)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Total number of questions; always at least 1.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Stable key for the question at `index`: its authored id, or the
    /// positional `q-{index}` fallback.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; callers index within
    /// `[0, total_questions)`.
    #[must_use]
    pub fn question_key(&self, index: usize) -> QuestionId {
        self.questions[index]
            .id()
            .cloned()
            .unwrap_or_else(|| QuestionId::positional(index))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = r#"[
        {"id": "intro-1", "text": "What is a relying party?",
         "options": ["The IdP", "The app consuming assertions"],
         "correctAnswerIndex": 1},
        {"text": "SAML assertions are encoded as…",
         "options": ["JSON", "XML"],
         "correctAnswerIndex": 1}
    ]"#;

    const WRAPPED: &str = r#"{"questions": [
        {"text": "FIDO2 credentials are bound to…",
         "options": ["An origin", "A password"],
         "correctAnswerIndex": 0,
         "explanation": "Origin binding is what defeats phishing."}
    ]}"#;

    #[test]
    fn bare_array_shape_normalizes() {
        let quiz = Quiz::from_json(BARE).unwrap();
        assert_eq!(quiz.total_questions(), 2);
        assert_eq!(quiz.question(0).unwrap().correct_answer(), 1);
    }

    #[test]
    fn wrapped_shape_normalizes() {
        let quiz = Quiz::from_json(WRAPPED).unwrap();
        assert_eq!(quiz.total_questions(), 1);
        assert_eq!(
            quiz.question(0).unwrap().explanation(),
            Some("Origin binding is what defeats phishing.")
        );
    }

    #[test]
    fn question_key_prefers_authored_id() {
        let quiz = Quiz::from_json(BARE).unwrap();
        assert_eq!(quiz.question_key(0), QuestionId::new("intro-1"));
        assert_eq!(quiz.question_key(1), QuestionId::positional(1));
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let err = Quiz::from_json("[]").unwrap_err();
        assert!(matches!(err, QuizError::Empty));
    }

    #[test]
    fn invalid_question_fails_at_load_with_its_index() {
        let err = Quiz::from_json(
            r#"[
                {"text": "ok", "options": ["a", "b"], "correctAnswerIndex": 0},
                {"text": "bad", "options": ["a", "b"], "correctAnswerIndex": 2}
            ]"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QuizError::Question {
                index: 1,
                source: QuestionError::CorrectAnswerOutOfRange { index: 2, options: 2 }
            }
        ));
    }
}
