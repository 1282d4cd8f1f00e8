use chrono::{DateTime, Utc};
use course_core::model::{BadgeId, ModuleId};
use sqlx::Row;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{BadgeRepository, StorageError};

#[async_trait::async_trait]
impl BadgeRepository for SqliteRepository {
    async fn award_badge(
        &self,
        module_id: &ModuleId,
        badge_id: &BadgeId,
        awarded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        // Idempotent: the first award wins, later awards are no-ops.
        sqlx::query(
            r"
                INSERT INTO badges (module_id, badge_id, awarded_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(module_id, badge_id) DO NOTHING
            ",
        )
        .bind(module_id.as_str())
        .bind(badge_id.as_str())
        .bind(awarded_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_badges(&self, module_id: &ModuleId) -> Result<Vec<BadgeId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT badge_id
                FROM badges
                WHERE module_id = ?1
                ORDER BY awarded_at ASC, rowid ASC
            ",
        )
        .bind(module_id.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(BadgeId::new(
                row.try_get::<String, _>("badge_id").map_err(ser)?,
            ));
        }

        Ok(out)
    }
}
