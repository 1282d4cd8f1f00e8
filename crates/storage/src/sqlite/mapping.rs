use course_core::model::{AttemptRecord, ModuleId, QuestionId};
use sqlx::Row;
use std::collections::BTreeMap;

use crate::repository::{AttemptRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Maps an `attempts` row plus its answer map back into a domain record.
pub(crate) fn map_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
    answers: BTreeMap<QuestionId, usize>,
) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let module_id = ModuleId::new(row.try_get::<String, _>("module_id").map_err(ser)?);
    let correct_count = u32_from_i64(
        "correct_count",
        row.try_get::<i64, _>("correct_count").map_err(ser)?,
    )?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let score = u8_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let passed = row.try_get::<i64, _>("passed").map_err(ser)? != 0;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    let record = AttemptRecord::from_persisted(
        module_id,
        answers,
        correct_count,
        total_questions,
        score,
        passed,
        completed_at,
    )
    .map_err(ser)?;

    Ok(AttemptRow::new(id, record))
}
