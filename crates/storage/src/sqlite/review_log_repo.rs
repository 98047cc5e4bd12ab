use srs_core::model::{Card, CardId, DeckId};

use super::SqliteRepository;
use super::card_repo::{UPSERT_CARD_SQL, bind_card};
use super::mapping::{id_i64, map_review_log_row, rating_to_i64};
use crate::repository::{ReviewLogRecord, ReviewLogRepository, ReviewPersistence, StorageError};

const INSERT_LOG_SQL: &str = r"
    INSERT INTO review_logs (
        deck_id, card_id, rating, reviewed_at,
        interval_days, ease_factor, repetitions, next_review_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ";

fn bind_log<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    log: &'q ReviewLogRecord,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>, StorageError>
{
    Ok(query
        .bind(id_i64("deck_id", log.deck_id.value())?)
        .bind(id_i64("card_id", log.card_id.value())?)
        .bind(rating_to_i64(log.rating))
        .bind(log.reviewed_at)
        .bind(i64::from(log.interval_days))
        .bind(log.ease_factor)
        .bind(i64::from(log.repetitions))
        .bind(log.next_review_at))
}

#[async_trait::async_trait]
impl ReviewLogRepository for SqliteRepository {
    async fn append_log(&self, log: ReviewLogRecord) -> Result<i64, StorageError> {
        let res = bind_log(sqlx::query(INSERT_LOG_SQL), &log)?
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.last_insert_rowid())
    }

    async fn logs_for_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, deck_id, card_id, rating, reviewed_at,
                    interval_days, ease_factor, repetitions, next_review_at
                FROM review_logs
                WHERE deck_id = ?1 AND card_id = ?2
                ORDER BY reviewed_at ASC, id ASC
            ",
        )
        .bind(id_i64("deck_id", deck_id.value())?)
        .bind(id_i64("card_id", card_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_review_log_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ReviewPersistence for SqliteRepository {
    async fn apply_review(&self, card: &Card, log: ReviewLogRecord) -> Result<i64, StorageError> {
        if log.card_id != card.id() || log.deck_id != card.deck_id() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        bind_card(sqlx::query(UPSERT_CARD_SQL), card)?
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = bind_log(sqlx::query(INSERT_LOG_SQL), &log)?
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }
}
