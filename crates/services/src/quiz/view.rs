use chrono::{DateTime, Utc};
use std::sync::Arc;

use course_core::model::{BadgeId, ModuleId};
use storage::repository::{AttemptRepository, AttemptRow, BadgeRepository, InMemoryRepository};

use crate::error::ProgressError;

/// Storage identifier for a persisted attempt.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type AttemptId = i64;

/// Presentation-agnostic list item for a finished attempt.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// The UI may format timestamps (e.g., relative time, locale) as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub completed_at: DateTime<Utc>,

    pub score: u8,
    pub passed: bool,
    pub correct: u32,
    pub total: u32,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow) -> Self {
        let record = &row.record;
        Self {
            id: row.id,
            completed_at: record.completed_at(),
            score: record.score(),
            passed: record.passed(),
            correct: record.correct_count(),
            total: record.total_questions(),
        }
    }
}

/// Aggregate progress for one module: attempt history plus held badges.
#[derive(Debug, Clone, Default)]
pub struct ModuleProgress {
    pub attempts: Vec<AttemptRow>,
    pub badges: Vec<BadgeId>,
}

impl ModuleProgress {
    /// Highest persisted score, 0 when no attempt exists yet.
    #[must_use]
    pub fn best_score(&self) -> u8 {
        self.attempts
            .iter()
            .map(|row| row.record.score())
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// The most recent attempt (history is most-recent-last).
    #[must_use]
    pub fn latest_attempt(&self) -> Option<&AttemptRow> {
        self.attempts.last()
    }

    #[must_use]
    pub fn has_badge(&self, badge_id: &BadgeId) -> bool {
        self.badges.iter().any(|held| held == badge_id)
    }
}

/// Progress facade that hides repositories from the presentation layer.
#[derive(Clone)]
pub struct ProgressService {
    attempts: Arc<dyn AttemptRepository>,
    badges: Arc<dyn BadgeRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>, badges: Arc<dyn BadgeRepository>) -> Self {
        Self { attempts, badges }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::new(Arc::new(repo.clone()), Arc::new(repo))
    }

    /// Load a module's attempt history and badges.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn module_progress(
        &self,
        module_id: &ModuleId,
    ) -> Result<ModuleProgress, ProgressError> {
        let attempts = self.attempts.list_attempts(module_id).await?;
        let badges = self.badges.list_badges(module_id).await?;
        Ok(ModuleProgress { attempts, badges })
    }

    /// Highest persisted score for a module, 0 when none exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn best_score(&self, module_id: &ModuleId) -> Result<u8, ProgressError> {
        let attempts = self.attempts.list_attempts(module_id).await?;
        Ok(attempts
            .iter()
            .map(|row| row.record.score())
            .max()
            .unwrap_or(0))
    }

    /// Attempt history as list items, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn list_attempts(
        &self,
        module_id: &ModuleId,
    ) -> Result<Vec<AttemptListItem>, ProgressError> {
        let rows = self.attempts.list_attempts(module_id).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }
}
