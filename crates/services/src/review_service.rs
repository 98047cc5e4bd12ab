use chrono::{DateTime, Utc};

use srs_core::{
    model::{Card, CardId, DeckId, Rating},
    scheduler::{AppliedReview, ScheduledStates, Scheduler, SchedulerConfig},
    time::Clock,
};
use storage::repository::{CardRepository, ReviewLogRecord, ReviewPersistence, StorageError};

use crate::error::ReviewServiceError;

//
// ─── REVIEW RESULT ─────────────────────────────────────────────────────────────
//

/// Result of processing a review: selected schedule, new state, and log.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub applied: AppliedReview,
}

/// Result of a persisted review: updated card, log ID, and the detail.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedReview {
    pub card: Card,
    pub log_id: i64,
    pub result: ReviewResult,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates applying a user's rating to a card via the scheduler.
///
/// Owns the clock so callers get deterministic time in tests, and the
/// scheduler so deck-level tuning stays in one place.
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
}

impl ReviewService {
    /// Create a review service with the default scheduler and real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
        }
    }

    /// Create a review service with custom scheduler tuning.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Scheduler` if the config is invalid.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, ReviewServiceError> {
        Ok(Self {
            clock: Clock::default(),
            scheduler: Scheduler::with_config(config)?,
        })
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// All four would-be outcomes for a card, for showing interval hints
    /// on the rating buttons before the user picks one.
    #[must_use]
    pub fn preview(&self, card: &Card, now: DateTime<Utc>) -> ScheduledStates {
        self.scheduler.preview(card.schedule(), now)
    }

    /// Apply a rating to a card, updating its scheduling state in place and
    /// returning the chosen schedule plus a log entry.
    #[must_use]
    pub fn review_card(
        &self,
        card: &mut Card,
        rating: Rating,
        reviewed_at: DateTime<Utc>,
    ) -> ReviewResult {
        let applied = self
            .scheduler
            .apply_review(card.id(), card.schedule(), rating, reviewed_at);
        card.apply_review(&applied.outcome, reviewed_at);
        ReviewResult { applied }
    }

    /// Apply a review to an in-memory card and persist the update + log
    /// atomically.
    ///
    /// If persistence fails, the card is rolled back to its original state.
    ///
    /// # Errors
    ///
    /// Returns storage errors if persistence fails.
    pub async fn review_card_persisted(
        &self,
        card: &mut Card,
        rating: Rating,
        reviewed_at: DateTime<Utc>,
        reviews: &dyn ReviewPersistence,
    ) -> Result<(ReviewResult, i64), ReviewServiceError> {
        let original = card.clone();

        let result = self.review_card(card, rating, reviewed_at);
        let record = ReviewLogRecord::from_applied(card.deck_id(), &result.applied);

        match reviews.apply_review(card, record).await {
            Ok(id) => Ok((result, id)),
            Err(err) => {
                *card = original;
                Err(err.into())
            }
        }
    }

    /// Load a card, apply a review, and persist the updated card and log
    /// atomically. Uses the service clock for `reviewed_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing, and storage
    /// errors if persistence fails.
    pub async fn review_card_persisted_by_id(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        cards: &dyn CardRepository,
        reviews: &dyn ReviewPersistence,
        rating: Rating,
    ) -> Result<PersistedReview, ReviewServiceError> {
        let mut card = cards
            .get_card(deck_id, card_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let reviewed_at = self.now();
        let (result, log_id) = self
            .review_card_persisted(&mut card, rating, reviewed_at, reviews)
            .await?;

        Ok(PersistedReview {
            card,
            log_id,
            result,
        })
    }
}

impl Default for ReviewService {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use srs_core::{
        model::{Deck, DeckSettings},
        time::fixed_now,
    };
    use storage::repository::{DeckRepository, InMemoryRepository, ReviewLogRepository};

    fn build_card() -> Card {
        Card::new(
            CardId::new(1),
            DeckId::new(1),
            "What is 2+2?",
            "4",
            fixed_now(),
        )
        .unwrap()
    }

    fn build_deck() -> Deck {
        Deck::new(
            DeckId::new(1),
            "Test",
            "",
            fixed_now(),
            DeckSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn review_new_card_updates_state_and_log() {
        let mut card = build_card();
        let fixed = fixed_now();
        let service = ReviewService::new().with_clock(Clock::Fixed(fixed));

        let reviewed_at = service.now();
        let result = service.review_card(&mut card, Rating::Good, reviewed_at);

        assert_eq!(result.applied.log.card_id, card.id());
        assert_eq!(result.applied.log.rating, Rating::Good);
        assert_eq!(card.schedule().repetitions, 1);
        assert_eq!(card.last_review_at(), Some(fixed));
        assert_eq!(card.next_review_at(), Some(fixed + Duration::days(1)));
    }

    #[test]
    fn preview_matches_review_outcome() {
        let mut card = build_card();
        let now = fixed_now();
        let service = ReviewService::new().with_clock(Clock::Fixed(now));

        let states = service.preview(&card, now);
        let result = service.review_card(&mut card, Rating::Hard, now);
        assert_eq!(&result.applied.outcome, states.select(Rating::Hard));
    }

    #[tokio::test]
    async fn review_card_persisted_updates_card_and_log() {
        let repo = InMemoryRepository::new();
        let deck = build_deck();
        repo.upsert_deck(&deck).await.unwrap();

        let card = build_card();
        repo.upsert_card(&card).await.unwrap();

        let service = ReviewService::new().with_clock(Clock::Fixed(fixed_now()));
        let result = service
            .review_card_persisted_by_id(deck.id(), card.id(), &repo, &repo, Rating::Hard)
            .await
            .unwrap();

        assert_eq!(result.card.schedule().repetitions, 1);
        let logs = repo.logs_for_card(deck.id(), card.id()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, Some(result.log_id));
        assert_eq!(logs[0].rating, Rating::Hard);
    }

    #[tokio::test]
    async fn missing_card_surfaces_not_found() {
        let repo = InMemoryRepository::new();
        let service = ReviewService::new();
        let err = service
            .review_card_persisted_by_id(
                DeckId::new(1),
                CardId::new(404),
                &repo,
                &repo,
                Rating::Good,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewServiceError::Storage(StorageError::NotFound)
        ));
    }
}
