use std::sync::Arc;

use course_core::model::{CourseModule, Quiz};
use storage::repository::{AttemptRepository, BadgeRepository};

use crate::Clock;
use crate::error::QuizSessionError;
use super::session::QuizSession;

/// Result of one `advance` call on a quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAdvance {
    /// Whether the call changed session state at all.
    pub moved: bool,
    pub is_complete: bool,
    /// Present exactly once, on the call that finished the quiz.
    pub outcome: Option<QuizOutcome>,
}

/// Summary of a just-finished attempt, available even when persistence
/// failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: u8,
    pub passed: bool,
    pub is_new_best: bool,
    pub badge_awarded: bool,
    /// Storage id of the recorded attempt; `None` means "progress not
    /// saved" and the UI should show a non-blocking warning.
    pub attempt_id: Option<i64>,
}

/// Orchestrates quiz session start and the persisted finish sequence.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
    badges: Arc<dyn BadgeRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        attempts: Arc<dyn AttemptRepository>,
        badges: Arc<dyn BadgeRepository>,
    ) -> Self {
        Self {
            clock,
            attempts,
            badges,
        }
    }

    /// Start a new session for the given module quiz, seeding the
    /// best-score baseline from the persisted history.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` when the history cannot be
    /// read.
    pub async fn start_session(
        &self,
        module: &CourseModule,
        quiz: Quiz,
    ) -> Result<QuizSession, QuizSessionError> {
        let rows = self.attempts.list_attempts(module.id()).await?;
        let best = rows.iter().map(|row| row.record.score()).max().unwrap_or(0);
        Ok(QuizSession::new(module, quiz, best, self.clock.now()))
    }

    /// Advance the session; when this finishes the quiz, run the finish
    /// sequence: record the attempt, then (ordered after the record write,
    /// on a passing score, for a module with a badge) award the badge,
    /// then refresh the displayed best score from storage.
    ///
    /// Persistence failures do not fail the call: the session still
    /// completes and the outcome still carries the score, with
    /// `attempt_id: None` marking the attempt as unsaved. Use
    /// `finalize_attempt` to retry persistence explicitly.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Attempt` only if the session produced an
    /// internally inconsistent record.
    pub async fn advance(
        &self,
        session: &mut QuizSession,
    ) -> Result<QuizAdvance, QuizSessionError> {
        let moved = session.next_question(self.clock.now());
        if !moved || !session.is_complete() {
            return Ok(QuizAdvance {
                moved,
                is_complete: session.is_complete(),
                outcome: None,
            });
        }

        let completed_at = session
            .completed_at()
            .ok_or(QuizSessionError::NotCompleted)?;
        let record = session.build_attempt(completed_at)?;

        let mut badge_awarded = false;
        match self.attempts.append_attempt(&record).await {
            Ok(id) => {
                session.set_attempt_id(id);
                badge_awarded = self.try_award_badge(session, record.passed()).await;
            }
            Err(error) => {
                tracing::warn!(module = %session.module_id(), %error, "quiz attempt not saved");
            }
        }

        self.refresh_best_score(session).await;

        Ok(QuizAdvance {
            moved: true,
            is_complete: true,
            outcome: Some(QuizOutcome {
                score: record.score(),
                passed: record.passed(),
                is_new_best: session.is_new_best().unwrap_or(false),
                badge_awarded,
                attempt_id: session.attempt_id(),
            }),
        })
    }

    /// Retry persistence for a completed session whose attempt write
    /// failed (e.g. transient storage error). Unlike `advance`, storage
    /// errors propagate here.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::NotCompleted` if the session is not
    /// complete, `QuizSessionError::Storage` if persistence fails.
    pub async fn finalize_attempt(
        &self,
        session: &mut QuizSession,
    ) -> Result<i64, QuizSessionError> {
        if let Some(id) = session.attempt_id() {
            return Ok(id);
        }

        let completed_at = session
            .completed_at()
            .ok_or(QuizSessionError::NotCompleted)?;
        let record = session.build_attempt(completed_at)?;
        let id = self.attempts.append_attempt(&record).await?;
        session.set_attempt_id(id);

        if record.passed()
            && let Some(badge) = session.badge().cloned()
        {
            self.badges
                .award_badge(session.module_id(), &badge, completed_at)
                .await?;
        }

        self.refresh_best_score(session).await;
        Ok(id)
    }

    /// Badge award half of the finish sequence; failures degrade to a
    /// warning so the user still sees their result.
    async fn try_award_badge(&self, session: &QuizSession, passed: bool) -> bool {
        if !passed {
            return false;
        }
        let Some(badge) = session.badge().cloned() else {
            return false;
        };
        let Some(awarded_at) = session.completed_at() else {
            return false;
        };
        match self
            .badges
            .award_badge(session.module_id(), &badge, awarded_at)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(module = %session.module_id(), %error, "badge not awarded");
                false
            }
        }
    }

    async fn refresh_best_score(&self, session: &mut QuizSession) {
        match self.attempts.list_attempts(session.module_id()).await {
            Ok(rows) => {
                let stored = rows.iter().map(|row| row.record.score()).max().unwrap_or(0);
                // An unsaved attempt still counts for this session's display.
                let local = session.score().unwrap_or(0);
                session.set_best_score(stored.max(local).max(session.best_score()));
            }
            Err(error) => {
                tracing::warn!(module = %session.module_id(), %error, "progress refresh failed");
                if let Some(score) = session.score() {
                    session.set_best_score(session.best_score().max(score));
                }
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
