use srs_core::model::{Card, CardId, DeckId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_card_row};
use crate::repository::{CardRepository, StorageError};

const CARD_COLUMNS: &str = "id, deck_id, question, answer, created_at, \
     next_review_at, last_review_at, interval_days, ease_factor, repetitions";

pub(super) const UPSERT_CARD_SQL: &str = r"
    INSERT INTO cards (
        id, deck_id, question, answer, created_at,
        next_review_at, last_review_at, interval_days, ease_factor, repetitions
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(id, deck_id) DO UPDATE SET
        -- keep created_at from the original insert; only update mutable fields
        question = excluded.question,
        answer = excluded.answer,
        next_review_at = excluded.next_review_at,
        last_review_at = excluded.last_review_at,
        interval_days = excluded.interval_days,
        ease_factor = excluded.ease_factor,
        repetitions = excluded.repetitions
    ";

pub(super) fn bind_card<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    card: &'q Card,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>, StorageError>
{
    Ok(query
        .bind(id_i64("card_id", card.id().value())?)
        .bind(id_i64("deck_id", card.deck_id().value())?)
        .bind(card.question())
        .bind(card.answer())
        .bind(card.created_at())
        .bind(card.next_review_at())
        .bind(card.last_review_at())
        .bind(i64::from(card.schedule().interval_days))
        .bind(card.schedule().ease_factor)
        .bind(i64::from(card.schedule().repetitions)))
}

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        bind_card(sqlx::query(UPSERT_CARD_SQL), card)?
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_card(&self, deck_id: DeckId, id: CardId) -> Result<Option<Card>, StorageError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 AND id = ?2");
        let row = sqlx::query(&sql)
            .bind(id_i64("deck_id", deck_id.value())?)
            .bind(id_i64("card_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_card_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("deck_id", deck_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn due_cards(
        &self,
        deck_id: DeckId,
        now: chrono::DateTime<chrono::Utc>,
        limit: u32,
    ) -> Result<Vec<Card>, StorageError> {
        let sql = format!(
            r"
            SELECT {CARD_COLUMNS}
            FROM cards
            WHERE deck_id = ?1
              AND last_review_at IS NOT NULL
              AND next_review_at <= ?2
            ORDER BY next_review_at ASC, id ASC
            LIMIT ?3
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("deck_id", deck_id.value())?)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn new_cards(&self, deck_id: DeckId, limit: u32) -> Result<Vec<Card>, StorageError> {
        let sql = format!(
            r"
            SELECT {CARD_COLUMNS}
            FROM cards
            WHERE deck_id = ?1
              AND last_review_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?2
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("deck_id", deck_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn delete_card(&self, deck_id: DeckId, id: CardId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM cards WHERE deck_id = ?1 AND id = ?2")
            .bind(id_i64("deck_id", deck_id.value())?)
            .bind(id_i64("card_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
