use course_core::model::{AttemptRecord, ModuleId, QuestionId};
use sqlx::Row;
use std::collections::{BTreeMap, HashMap};

use super::{SqliteRepository, mapping};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

fn answer_index_i64(question: &QuestionId, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v)
        .map_err(|_| StorageError::Serialization(format!("answer index overflow for {question}")))
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<i64, StorageError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    module_id, correct_count, total_questions,
                    score, passed, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(record.module_id().as_str())
        .bind(i64::from(record.correct_count()))
        .bind(i64::from(record.total_questions()))
        .bind(i64::from(record.score()))
        .bind(i64::from(record.passed()))
        .bind(record.completed_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let attempt_id = res.last_insert_rowid();

        for (question_id, answer) in record.answers() {
            sqlx::query(
                r"
                    INSERT INTO attempt_answers (attempt_id, question_id, answer_index)
                    VALUES (?1, ?2, ?3)
                ",
            )
            .bind(attempt_id)
            .bind(question_id.as_str())
            .bind(answer_index_i64(question_id, *answer)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(attempt_id)
    }

    async fn list_attempts(&self, module_id: &ModuleId) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, module_id, correct_count, total_questions,
                    score, passed, completed_at
                FROM attempts
                WHERE module_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(module_id.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<i64, _>("id").map_err(mapping::ser)?);
        }

        let mut sql = String::from(
            r"
                SELECT attempt_id, question_id, answer_index
                FROM attempt_answers
                WHERE attempt_id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(*id);
        }

        let answer_rows = query
            .fetch_all(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut answers_by_attempt: HashMap<i64, BTreeMap<QuestionId, usize>> = HashMap::new();
        for row in answer_rows {
            let attempt_id: i64 = row.try_get("attempt_id").map_err(mapping::ser)?;
            let question_id = QuestionId::new(row.try_get::<String, _>("question_id").map_err(mapping::ser)?);
            let answer = mapping::usize_from_i64(
                "answer_index",
                row.try_get::<i64, _>("answer_index").map_err(mapping::ser)?,
            )?;
            answers_by_attempt
                .entry(attempt_id)
                .or_default()
                .insert(question_id, answer);
        }

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(mapping::ser)?;
            let answers = answers_by_attempt.remove(&id).unwrap_or_default();
            out.push(mapping::map_attempt_row(&row, answers)?);
        }

        Ok(out)
    }
}
