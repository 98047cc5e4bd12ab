use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use srs_core::model::{Deck, DeckId, DeckSettings};

use super::SqliteRepository;
use super::mapping::{deck_id_from_i64, id_i64, ser};
use crate::repository::{DeckRepository, NewDeckRecord, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO decks (name, description, created_at, session_limit, new_cards_per_session)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(deck.name)
        .bind(deck.description)
        .bind(deck.created_at)
        .bind(i64::from(deck.settings.session_limit))
        .bind(i64::from(deck.settings.new_cards_per_session))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        deck_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO decks (id, name, description, created_at, session_limit, new_cards_per_session)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                session_limit = excluded.session_limit,
                new_cards_per_session = excluded.new_cards_per_session
            ",
        )
        .bind(id_i64("deck_id", deck.id().value())?)
        .bind(deck.name().to_owned())
        .bind(deck.description().to_owned())
        .bind(deck.created_at())
        .bind(i64::from(deck.settings().session_limit))
        .bind(i64::from(deck.settings().new_cards_per_session))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, description, created_at, session_limit, new_cards_per_session
            FROM decks WHERE id = ?1
            ",
        )
        .bind(id_i64("deck_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => deck_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, created_at, session_limit, new_cards_per_session
            FROM decks
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut decks = Vec::with_capacity(rows.len());
        for row in rows {
            decks.push(deck_from_row(&row)?);
        }
        Ok(decks)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM decks WHERE id = ?1")
            .bind(id_i64("deck_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

fn deck_from_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    let settings = DeckSettings::new(
        u32::try_from(row.try_get::<i64, _>("session_limit").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("session_limit overflow".into()))?,
        u32::try_from(row.try_get::<i64, _>("new_cards_per_session").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("new_cards_per_session overflow".into()))?,
    )
    .map_err(ser)?;

    Deck::new(
        deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        settings,
    )
    .map_err(ser)
}
