use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{AttemptRecord, BadgeAward, BadgeId, ModuleId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted attempt together with its storage identifier.
///
/// The id is the backend's row id (`i64` to match `SQLite`); within one
/// module, ascending ids follow insertion order, most-recent-last.
#[derive(Debug, Clone)]
pub struct AttemptRow {
    pub id: i64,
    pub record: AttemptRecord,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, record: AttemptRecord) -> Self {
        Self { id, record }
    }
}

/// Repository contract for attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a finished attempt to its module's history.
    ///
    /// History is append-only: records are never mutated or deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<i64, StorageError>;

    /// Fetch a module's attempts in insertion order, most-recent-last.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; an unknown module
    /// yields an empty history, not `NotFound`.
    async fn list_attempts(&self, module_id: &ModuleId) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Repository contract for badge awards.
#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// Award a badge for a module. Idempotent: awarding an already-held
    /// badge is a no-op and never duplicates it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the award cannot be stored.
    async fn award_badge(
        &self,
        module_id: &ModuleId,
        badge_id: &BadgeId,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch the badges held for a module, in award order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_badges(&self, module_id: &ModuleId) -> Result<Vec<BadgeId>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    attempts: Arc<Mutex<HashMap<ModuleId, Vec<AttemptRow>>>>,
    badges: Arc<Mutex<HashMap<ModuleId, Vec<BadgeAward>>>>,
    next_id: Arc<Mutex<i64>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            badges: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<i64, StorageError> {
        let id = {
            let mut counter = self
                .next_id
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            *counter += 1;
            *counter
        };
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .entry(record.module_id().clone())
            .or_default()
            .push(AttemptRow::new(id, record.clone()));
        Ok(id)
    }

    async fn list_attempts(&self, module_id: &ModuleId) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(module_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl BadgeRepository for InMemoryRepository {
    async fn award_badge(
        &self,
        module_id: &ModuleId,
        badge_id: &BadgeId,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .badges
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let held = guard.entry(module_id.clone()).or_default();
        if held.iter().any(|award| &award.badge_id == badge_id) {
            return Ok(());
        }
        held.push(BadgeAward::new(
            module_id.clone(),
            badge_id.clone(),
            awarded_at,
        ));
        Ok(())
    }

    async fn list_badges(&self, module_id: &ModuleId) -> Result<Vec<BadgeId>, StorageError> {
        let guard = self
            .badges
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(module_id)
            .map(|held| held.iter().map(|award| award.badge_id.clone()).collect())
            .unwrap_or_default())
    }
}

/// Aggregates the progress repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub attempts: Arc<dyn AttemptRepository>,
    pub badges: Arc<dyn BadgeRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let badges: Arc<dyn BadgeRepository> = Arc::new(repo);
        Self { attempts, badges }
    }
}
