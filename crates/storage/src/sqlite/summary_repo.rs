use sqlx::Row;
use srs_core::model::{DeckId, RatingCounts, SessionSummary};

use super::SqliteRepository;
use super::mapping::{deck_id_from_i64, id_i64, ser};
use crate::repository::{SessionSummaryRepository, StorageError};

#[async_trait::async_trait]
impl SessionSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let counts = summary.counts();
        let res = sqlx::query(
            r"
            INSERT INTO session_summaries (
                deck_id, started_at, finished_at, total_reviews, again, hard, good, easy
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("deck_id", summary.deck_id().value())?)
        .bind(summary.started_at())
        .bind(summary.finished_at())
        .bind(i64::from(summary.total_reviews()))
        .bind(i64::from(counts.again))
        .bind(i64::from(counts.hard))
        .bind(i64::from(counts.good))
        .bind(i64::from(counts.easy))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn summaries_for_deck(
        &self,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT deck_id, started_at, finished_at, total_reviews, again, hard, good, easy
            FROM session_summaries
            WHERE deck_id = ?1
            ORDER BY finished_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(id_i64("deck_id", deck_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let count = |field: &str| -> Result<u32, StorageError> {
                u32::try_from(row.try_get::<i64, _>(field).map_err(ser)?)
                    .map_err(|_| StorageError::Serialization(format!("{field} overflow")))
            };
            let counts = RatingCounts {
                again: count("again")?,
                hard: count("hard")?,
                good: count("good")?,
                easy: count("easy")?,
            };
            out.push(
                SessionSummary::from_persisted(
                    deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
                    row.try_get("started_at").map_err(ser)?,
                    row.try_get("finished_at").map_err(ser)?,
                    count("total_reviews")?,
                    counts,
                )
                .map_err(ser)?,
            );
        }
        Ok(out)
    }
}
