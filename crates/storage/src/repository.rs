use async_trait::async_trait;
use chrono::{DateTime, Utc};
use srs_core::model::{Card, CardId, Deck, DeckId, DeckSettings, Rating, SessionSummary};
use srs_core::scheduler::AppliedReview;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Input for creating a deck whose ID is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewDeckRecord {
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub settings: DeckSettings,
}

/// Persisted shape of one review event.
///
/// Captures the rating together with the scheduling state it produced, so
/// the review history can be replayed or audited without re-running the
/// scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLogRecord {
    /// Row ID once stored; `None` before the first insert.
    pub id: Option<i64>,
    pub deck_id: DeckId,
    pub card_id: CardId,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
}

impl ReviewLogRecord {
    /// Build a log record from a scheduler result.
    #[must_use]
    pub fn from_applied(deck_id: DeckId, applied: &AppliedReview) -> Self {
        Self {
            id: None,
            deck_id,
            card_id: applied.log.card_id,
            rating: applied.log.rating,
            reviewed_at: applied.log.reviewed_at,
            interval_days: applied.outcome.interval_days,
            ease_factor: applied.outcome.ease_factor,
            repetitions: applied.outcome.repetitions,
            next_review_at: applied.outcome.next_review,
        }
    }
}

//
// ─── REPOSITORY CONTRACTS ─────────────────────────────────────────────────────
//

#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Create a deck and let the backend assign its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError>;

    /// Persist or update a deck with a known ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;

    /// List decks ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, StorageError>;

    /// Delete a deck and, transitively, its cards, logs, and summaries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Persist or update a card. `created_at` is write-once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError>;

    /// Fetch one card; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_card(&self, deck_id: DeckId, id: CardId) -> Result<Option<Card>, StorageError>;

    /// All cards in a deck, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError>;

    /// Reviewed cards whose due time has passed, most overdue first
    /// (ties broken by ID).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn due_cards(
        &self,
        deck_id: DeckId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Card>, StorageError>;

    /// Never-reviewed cards, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn new_cards(&self, deck_id: DeckId, limit: u32) -> Result<Vec<Card>, StorageError>;

    /// Delete a card and its review logs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn delete_card(&self, deck_id: DeckId, id: CardId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ReviewLogRepository: Send + Sync {
    /// Append one review log entry; returns its row ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_log(&self, log: ReviewLogRecord) -> Result<i64, StorageError>;

    /// Review history for one card, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn logs_for_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<Vec<ReviewLogRecord>, StorageError>;
}

/// Atomic card-update-plus-log-append for a single review.
///
/// The two writes either both land or neither does, so a card's schedule can
/// never drift from its review history.
#[async_trait]
pub trait ReviewPersistence: Send + Sync {
    /// Persist the reviewed card and its log entry in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the log does not belong to the
    /// card, or other storage errors.
    async fn apply_review(&self, card: &Card, log: ReviewLogRecord) -> Result<i64, StorageError>;
}

#[async_trait]
pub trait SessionSummaryRepository: Send + Sync {
    /// Append a finished session's summary; returns its row ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// Summaries for a deck, most recently finished first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn summaries_for_deck(
        &self,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ────────────────────────────────────────────────────────
//

/// In-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    decks: Arc<Mutex<HashMap<DeckId, Deck>>>,
    cards: Arc<Mutex<HashMap<(DeckId, CardId), Card>>>,
    logs: Arc<Mutex<Vec<ReviewLogRecord>>>,
    summaries: Arc<Mutex<Vec<SessionSummary>>>,
    next_deck_id: Arc<AtomicI64>,
    next_log_id: Arc<AtomicI64>,
    next_summary_id: Arc<AtomicI64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decks: Arc::new(Mutex::new(HashMap::new())),
            cards: Arc::new(Mutex::new(HashMap::new())),
            logs: Arc::new(Mutex::new(Vec::new())),
            summaries: Arc::new(Mutex::new(Vec::new())),
            next_deck_id: Arc::new(AtomicI64::new(1)),
            next_log_id: Arc::new(AtomicI64::new(1)),
            next_summary_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let raw = self.next_deck_id.fetch_add(1, Ordering::SeqCst);
        let id = DeckId::new(
            u64::try_from(raw).map_err(|_| StorageError::Serialization("deck_id overflow".into()))?,
        );
        let deck = Deck::new(id, deck.name, deck.description, deck.created_at, deck.settings)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.decks.lock().map_err(lock_err)?.insert(id, deck);
        Ok(id)
    }

    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        self.decks
            .lock()
            .map_err(lock_err)?
            .insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        Ok(self.decks.lock().map_err(lock_err)?.get(&id).cloned())
    }

    async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, StorageError> {
        let guard = self.decks.lock().map_err(lock_err)?;
        let mut decks: Vec<Deck> = guard.values().cloned().collect();
        decks.sort_by_key(Deck::id);
        decks.truncate(limit as usize);
        Ok(decks)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        if self.decks.lock().map_err(lock_err)?.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        self.cards
            .lock()
            .map_err(lock_err)?
            .retain(|(deck_id, _), _| *deck_id != id);
        self.logs
            .lock()
            .map_err(lock_err)?
            .retain(|log| log.deck_id != id);
        self.summaries
            .lock()
            .map_err(lock_err)?
            .retain(|s| s.deck_id() != id);
        Ok(())
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        self.cards
            .lock()
            .map_err(lock_err)?
            .insert((card.deck_id(), card.id()), card.clone());
        Ok(())
    }

    async fn get_card(&self, deck_id: DeckId, id: CardId) -> Result<Option<Card>, StorageError> {
        Ok(self
            .cards
            .lock()
            .map_err(lock_err)?
            .get(&(deck_id, id))
            .cloned())
    }

    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let guard = self.cards.lock().map_err(lock_err)?;
        let mut cards: Vec<Card> = guard
            .values()
            .filter(|c| c.deck_id() == deck_id)
            .cloned()
            .collect();
        cards.sort_by_key(Card::id);
        Ok(cards)
    }

    async fn due_cards(
        &self,
        deck_id: DeckId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Card>, StorageError> {
        let guard = self.cards.lock().map_err(lock_err)?;
        let mut cards: Vec<Card> = guard
            .values()
            .filter(|c| c.deck_id() == deck_id && c.is_due(now))
            .cloned()
            .collect();
        cards.sort_by_key(|c| (c.next_review_at(), c.id()));
        cards.truncate(limit as usize);
        Ok(cards)
    }

    async fn new_cards(&self, deck_id: DeckId, limit: u32) -> Result<Vec<Card>, StorageError> {
        let guard = self.cards.lock().map_err(lock_err)?;
        let mut cards: Vec<Card> = guard
            .values()
            .filter(|c| c.deck_id() == deck_id && c.is_new())
            .cloned()
            .collect();
        cards.sort_by_key(|c| (c.created_at(), c.id()));
        cards.truncate(limit as usize);
        Ok(cards)
    }

    async fn delete_card(&self, deck_id: DeckId, id: CardId) -> Result<(), StorageError> {
        if self
            .cards
            .lock()
            .map_err(lock_err)?
            .remove(&(deck_id, id))
            .is_none()
        {
            return Err(StorageError::NotFound);
        }
        self.logs
            .lock()
            .map_err(lock_err)?
            .retain(|log| !(log.deck_id == deck_id && log.card_id == id));
        Ok(())
    }
}

#[async_trait]
impl ReviewLogRepository for InMemoryRepository {
    async fn append_log(&self, mut log: ReviewLogRecord) -> Result<i64, StorageError> {
        let id = self.next_log_id.fetch_add(1, Ordering::SeqCst);
        log.id = Some(id);
        self.logs.lock().map_err(lock_err)?.push(log);
        Ok(id)
    }

    async fn logs_for_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let guard = self.logs.lock().map_err(lock_err)?;
        let mut out: Vec<ReviewLogRecord> = guard
            .iter()
            .filter(|log| log.deck_id == deck_id && log.card_id == card_id)
            .cloned()
            .collect();
        out.sort_by_key(|log| log.reviewed_at);
        Ok(out)
    }
}

#[async_trait]
impl ReviewPersistence for InMemoryRepository {
    async fn apply_review(&self, card: &Card, log: ReviewLogRecord) -> Result<i64, StorageError> {
        if log.card_id != card.id() || log.deck_id != card.deck_id() {
            return Err(StorageError::Conflict);
        }
        // Single mutex pair; both writes happen under locks held back to back,
        // which is as atomic as the in-memory backend needs to be.
        self.upsert_card(card).await?;
        self.append_log(log).await
    }
}

#[async_trait]
impl SessionSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let id = self.next_summary_id.fetch_add(1, Ordering::SeqCst);
        self.summaries.lock().map_err(lock_err)?.push(summary.clone());
        Ok(id)
    }

    async fn summaries_for_deck(
        &self,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        let guard = self.summaries.lock().map_err(lock_err)?;
        let mut out: Vec<SessionSummary> = guard
            .iter()
            .filter(|s| s.deck_id() == deck_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.finished_at().cmp(&a.finished_at()));
        out.truncate(limit as usize);
        Ok(out)
    }
}

//
// ─── STORAGE AGGREGATE ────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects so backends can be
/// swapped without touching the service layer.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub review_logs: Arc<dyn ReviewLogRepository>,
    pub reviews: Arc<dyn ReviewPersistence>,
    pub summaries: Arc<dyn SessionSummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            decks: Arc::new(repo.clone()),
            cards: Arc::new(repo.clone()),
            review_logs: Arc::new(repo.clone()),
            reviews: Arc::new(repo.clone()),
            summaries: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use srs_core::model::{Rating, RatingCounts};
    use srs_core::scheduler::{ScheduleState, Scheduler};
    use srs_core::time::fixed_now;

    fn build_deck(id: u64) -> Deck {
        Deck::new(
            DeckId::new(id),
            format!("Deck {id}"),
            "",
            fixed_now(),
            DeckSettings::default(),
        )
        .unwrap()
    }

    fn build_card(id: u64, deck_id: DeckId) -> Card {
        Card::new(CardId::new(id), deck_id, "Q", "A", fixed_now()).unwrap()
    }

    #[tokio::test]
    async fn deck_ids_are_assigned_sequentially() {
        let repo = InMemoryRepository::new();
        let first = repo
            .insert_new_deck(NewDeckRecord {
                name: "Spanish".into(),
                description: String::new(),
                created_at: fixed_now(),
                settings: DeckSettings::default(),
            })
            .await
            .unwrap();
        let second = repo
            .insert_new_deck(NewDeckRecord {
                name: "French".into(),
                description: String::new(),
                created_at: fixed_now(),
                settings: DeckSettings::default(),
            })
            .await
            .unwrap();
        assert_ne!(first, second);

        let decks = repo.list_decks(10).await.unwrap();
        assert_eq!(decks.len(), 2);
        assert_eq!(decks[0].name(), "Spanish");
    }

    #[tokio::test]
    async fn reviewed_card_round_trips_with_schedule() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1);
        repo.upsert_deck(&deck).await.unwrap();

        let mut card = build_card(1, deck.id());
        let applied = Scheduler::new().apply_review(
            card.id(),
            &ScheduleState::new(),
            Rating::Good,
            fixed_now(),
        );
        card.apply_review(&applied.outcome, fixed_now());
        repo.upsert_card(&card).await.unwrap();

        let fetched = repo.get_card(deck.id(), card.id()).await.unwrap().unwrap();
        assert_eq!(fetched.schedule().repetitions, 1);
        assert_eq!(fetched.last_review_at(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn due_query_excludes_new_and_future_cards() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1);
        repo.upsert_deck(&deck).await.unwrap();
        let now = fixed_now();

        // id 1: new, id 2: due yesterday, id 3: due tomorrow
        repo.upsert_card(&build_card(1, deck.id())).await.unwrap();

        let mut overdue = build_card(2, deck.id());
        overdue.apply_review(
            &srs_core::model::ReviewOutcome::new(now - Duration::days(1), 1, 2.5, 1),
            now - Duration::days(2),
        );
        repo.upsert_card(&overdue).await.unwrap();

        let mut future = build_card(3, deck.id());
        future.apply_review(
            &srs_core::model::ReviewOutcome::new(now + Duration::days(1), 1, 2.5, 1),
            now,
        );
        repo.upsert_card(&future).await.unwrap();

        let due = repo.due_cards(deck.id(), now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), CardId::new(2));

        let fresh = repo.new_cards(deck.id(), 10).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id(), CardId::new(1));
    }

    #[tokio::test]
    async fn apply_review_rejects_mismatched_log() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1);
        let card = build_card(1, deck.id());
        let applied = Scheduler::new().apply_review(
            CardId::new(99),
            &ScheduleState::new(),
            Rating::Good,
            fixed_now(),
        );
        let log = ReviewLogRecord::from_applied(deck.id(), &applied);

        let err = repo.apply_review(&card, log).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn delete_deck_cascades() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1);
        repo.upsert_deck(&deck).await.unwrap();
        repo.upsert_card(&build_card(1, deck.id())).await.unwrap();
        let summary = SessionSummary::from_persisted(
            deck.id(),
            fixed_now(),
            fixed_now(),
            0,
            RatingCounts::default(),
        )
        .unwrap();
        repo.append_summary(&summary).await.unwrap();

        repo.delete_deck(deck.id()).await.unwrap();

        assert!(repo.get_deck(deck.id()).await.unwrap().is_none());
        assert!(repo.list_cards(deck.id()).await.unwrap().is_empty());
        assert!(repo.summaries_for_deck(deck.id(), 10).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_deck(deck.id()).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn summary_ids_are_not_reused_after_deck_deletion() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1);
        repo.upsert_deck(&deck).await.unwrap();
        let summary = SessionSummary::from_persisted(
            deck.id(),
            fixed_now(),
            fixed_now(),
            0,
            RatingCounts::default(),
        )
        .unwrap();

        let first = repo.append_summary(&summary).await.unwrap();
        repo.delete_deck(deck.id()).await.unwrap();

        repo.upsert_deck(&deck).await.unwrap();
        let second = repo.append_summary(&summary).await.unwrap();
        assert!(second > first);
    }
}
