use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{ModuleId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt covers no questions")]
    NoQuestions,

    #[error("correct count ({correct}) exceeds total questions ({total})")]
    CountExceedsTotal { correct: u32, total: u32 },

    #[error("answer map has {answers} entries for {total} questions")]
    TooManyAnswers { answers: usize, total: u32 },

    #[error("stored score {stored} does not match computed score {computed}")]
    ScoreMismatch { stored: u8, computed: u8 },
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Integer percentage score, rounded half up.
///
/// `total` is expected to be non-zero; a zero total yields 0 rather than
/// a division error so callers can stay infallible on already-validated
/// data.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage_score(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (f64::from(correct) * 100.0 / f64::from(total)).round();
    percent.clamp(0.0, 100.0) as u8
}

//
// ─── ATTEMPT RECORD ────────────────────────────────────────────────────────────
//

/// One finished pass through a module quiz.
///
/// Created exactly once per finish and immutable thereafter; storage
/// appends it to the module's history and never mutates or deletes it.
/// Answers are keyed by `QuestionId`, including the `q-{index}` positional
/// fallback for questions authored without an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    module_id: ModuleId,
    answers: BTreeMap<QuestionId, usize>,
    correct_count: u32,
    total_questions: u32,
    score: u8,
    passed: bool,
    completed_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Build a record for a just-finished attempt, computing score and
    /// pass/fail from the raw counts.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoQuestions` for a zero total,
    /// `AttemptError::CountExceedsTotal` when `correct_count` is larger
    /// than `total_questions`, and `AttemptError::TooManyAnswers` when the
    /// answer map has more entries than there are questions.
    pub fn new(
        module_id: ModuleId,
        answers: BTreeMap<QuestionId, usize>,
        correct_count: u32,
        total_questions: u32,
        passing_score: u8,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let score = percentage_score(correct_count, total_questions);
        Self::from_persisted(
            module_id,
            answers,
            correct_count,
            total_questions,
            score,
            score >= passing_score,
            completed_at,
        )
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ScoreMismatch` if the stored score does not
    /// match the stored counts, plus the count validations of `new`.
    pub fn from_persisted(
        module_id: ModuleId,
        answers: BTreeMap<QuestionId, usize>,
        correct_count: u32,
        total_questions: u32,
        score: u8,
        passed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if total_questions == 0 {
            return Err(AttemptError::NoQuestions);
        }
        if correct_count > total_questions {
            return Err(AttemptError::CountExceedsTotal {
                correct: correct_count,
                total: total_questions,
            });
        }
        if answers.len() > total_questions as usize {
            return Err(AttemptError::TooManyAnswers {
                answers: answers.len(),
                total: total_questions,
            });
        }
        let computed = percentage_score(correct_count, total_questions);
        if score != computed {
            return Err(AttemptError::ScoreMismatch {
                stored: score,
                computed,
            });
        }

        Ok(Self {
            module_id,
            answers,
            correct_count,
            total_questions,
            score,
            passed,
            completed_at,
        })
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Chosen option index per question key; unanswered questions are
    /// absent.
    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, usize> {
        &self.answers
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn answers(pairs: &[(&str, usize)]) -> BTreeMap<QuestionId, usize> {
        pairs
            .iter()
            .map(|(k, v)| (QuestionId::new(*k), *v))
            .collect()
    }

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(percentage_score(4, 5), 80);
        assert_eq!(percentage_score(3, 5), 60);
        assert_eq!(percentage_score(1, 3), 33);
        assert_eq!(percentage_score(2, 3), 67);
        assert_eq!(percentage_score(1, 8), 13);
        assert_eq!(percentage_score(0, 7), 0);
        assert_eq!(percentage_score(7, 7), 100);
    }

    #[test]
    fn new_computes_pass_fail_at_threshold() {
        let at = AttemptRecord::new(
            ModuleId::new("oauth2"),
            answers(&[("q-0", 0), ("q-1", 1)]),
            4,
            5,
            80,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(at.score(), 80);
        assert!(at.passed());

        let below = AttemptRecord::new(
            ModuleId::new("oauth2"),
            answers(&[("q-0", 2)]),
            3,
            5,
            80,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(below.score(), 60);
        assert!(!below.passed());
    }

    #[test]
    fn count_exceeding_total_is_rejected() {
        let err = AttemptRecord::new(
            ModuleId::new("oauth2"),
            BTreeMap::new(),
            6,
            5,
            80,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AttemptError::CountExceedsTotal { correct: 6, total: 5 }
        ));
    }

    #[test]
    fn persisted_score_must_match_counts() {
        let err = AttemptRecord::from_persisted(
            ModuleId::new("oauth2"),
            BTreeMap::new(),
            4,
            5,
            75,
            false,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AttemptError::ScoreMismatch {
                stored: 75,
                computed: 80
            }
        ));
    }

    #[test]
    fn zero_total_is_rejected() {
        let err = AttemptRecord::new(
            ModuleId::new("oauth2"),
            BTreeMap::new(),
            0,
            0,
            80,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::NoQuestions));
    }
}
