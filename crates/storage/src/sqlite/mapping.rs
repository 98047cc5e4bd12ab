use sqlx::Row;
use srs_core::model::{Card, CardId, DeckId, Rating};
use srs_core::scheduler::ScheduleState;

use crate::repository::{ReviewLogRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

/// Ratings are stored as their 1-4 ordinal, the same numbers the wire uses.
pub(crate) fn rating_to_i64(rating: Rating) -> i64 {
    i64::from(rating.as_u8())
}

pub(crate) fn rating_from_i64(value: i64) -> Result<Rating, StorageError> {
    let byte = u8::try_from(value)
        .map_err(|_| StorageError::Serialization(format!("invalid rating: {value}")))?;
    Rating::from_u8(byte).map_err(ser)
}

pub(crate) fn map_card_row(row: &sqlx::sqlite::SqliteRow) -> Result<Card, StorageError> {
    let schedule = ScheduleState {
        interval_days: i64_to_u32("interval_days", row.try_get("interval_days").map_err(ser)?)?,
        ease_factor: row.try_get("ease_factor").map_err(ser)?,
        repetitions: i64_to_u32("repetitions", row.try_get("repetitions").map_err(ser)?)?,
    };

    Card::from_persisted(
        card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        row.try_get::<String, _>("question").map_err(ser)?,
        row.try_get::<String, _>("answer").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("next_review_at").map_err(ser)?,
        row.try_get("last_review_at").map_err(ser)?,
        schedule,
    )
    .map_err(ser)
}

pub(crate) fn map_review_log_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ReviewLogRecord, StorageError> {
    Ok(ReviewLogRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        deck_id: deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        card_id: card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?,
        rating: rating_from_i64(row.try_get::<i64, _>("rating").map_err(ser)?)?,
        reviewed_at: row.try_get("reviewed_at").map_err(ser)?,
        interval_days: i64_to_u32("interval_days", row.try_get("interval_days").map_err(ser)?)?,
        ease_factor: row.try_get("ease_factor").map_err(ser)?,
        repetitions: i64_to_u32("repetitions", row.try_get("repetitions").map_err(ser)?)?,
        next_review_at: row.try_get("next_review_at").map_err(ser)?,
    })
}
