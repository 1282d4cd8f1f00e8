use thiserror::Error;

use crate::model::ids::{BadgeId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("passing score must be between 1 and 100, got {0}")]
    InvalidPassingScore(u8),
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Percentage threshold that determines pass/fail and badge eligibility.
pub const PASSING_SCORE: u8 = 80;

/// Quiz configuration for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    passing_score: u8,
}

impl QuizSettings {
    /// Creates settings with an explicit passing threshold.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::InvalidPassingScore` unless
    /// `1 <= passing_score <= 100`.
    pub fn new(passing_score: u8) -> Result<Self, ModuleError> {
        if passing_score == 0 || passing_score > 100 {
            return Err(ModuleError::InvalidPassingScore(passing_score));
        }
        Ok(Self { passing_score })
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            passing_score: PASSING_SCORE,
        }
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// A top-level course unit with one module-level quiz.
///
/// Lesson content itself lives with the content collaborator; this type
/// carries only what the quiz core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseModule {
    id: ModuleId,
    title: String,
    badge: Option<BadgeId>,
    settings: QuizSettings,
}

impl CourseModule {
    /// Creates a new module descriptor.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` for a blank title.
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        badge: Option<BadgeId>,
        settings: QuizSettings,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            badge,
            settings,
        })
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The badge awarded on passing this module's quiz, if any.
    #[must_use]
    pub fn badge(&self) -> Option<&BadgeId> {
        self.badge.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
