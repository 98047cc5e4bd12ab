use std::sync::Arc;

use srs_core::model::{DeckId, Rating};
use storage::repository::{
    CardRepository, DeckRepository, ReviewPersistence, SessionSummaryRepository, StorageError,
};

use super::plan::SessionBuilder;
use super::service::{SessionReview, StudySession};
use crate::Clock;
use crate::error::SessionError;
use crate::review_service::ReviewService;

/// Result of answering a single card in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub review: SessionReview,
    pub is_complete: bool,
    pub summary_id: Option<i64>,
}

/// Orchestrates session start and persisted answering.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    decks: Arc<dyn DeckRepository>,
    cards: Arc<dyn CardRepository>,
    reviews: Arc<dyn ReviewPersistence>,
    summaries: Arc<dyn SessionSummaryRepository>,
    shuffle_new: bool,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        decks: Arc<dyn DeckRepository>,
        cards: Arc<dyn CardRepository>,
        reviews: Arc<dyn ReviewPersistence>,
        summaries: Arc<dyn SessionSummaryRepository>,
    ) -> Self {
        Self {
            clock,
            decks,
            cards,
            reviews,
            summaries,
            shuffle_new: false,
        }
    }

    #[must_use]
    pub fn with_shuffle_new(mut self, shuffle_new: bool) -> Self {
        self.shuffle_new = shuffle_new;
        self
    }

    /// Start a new session for the given deck.
    ///
    /// Pulls due cards first, tops up with new cards per deck settings, and
    /// falls back to the whole deck when nothing is due or new, so a study
    /// request never comes back empty while the deck has cards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the deck does not exist and
    /// `SessionError::Empty` if it has no cards at all.
    pub async fn start_session(&self, deck_id: DeckId) -> Result<StudySession, SessionError> {
        let now = self.clock.now();
        let deck = self
            .decks
            .get_deck(deck_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let settings = deck.settings();
        let due = self
            .cards
            .due_cards(deck_id, now, settings.session_limit)
            .await?;
        let fresh = self
            .cards
            .new_cards(deck_id, settings.new_cards_per_session)
            .await?;

        let plan = SessionBuilder::new(&deck)
            .with_shuffle_new(self.shuffle_new)
            .build(due, fresh);

        let cards = if plan.is_empty() {
            // Ahead of schedule: review the whole deck anyway.
            let mut all = self.cards.list_cards(deck_id).await?;
            all.truncate(usize::try_from(settings.session_limit).unwrap_or(usize::MAX));
            all
        } else {
            plan.cards
        };

        StudySession::new(&deck, cards, now)
    }

    /// Answer the current card and persist review + summary when completed.
    ///
    /// The rating is applied through `ReviewService`, the card update and
    /// log land atomically, and the session summary is appended once the
    /// last card has been answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AnswerNotRevealed` when the card's answer has
    /// not been shown, and review or persistence failures otherwise.
    pub async fn answer_current(
        &self,
        session: &mut StudySession,
        rating: Rating,
    ) -> Result<SessionAnswerResult, SessionError> {
        let review_service = ReviewService::new().with_clock(self.clock);
        let reviewed_at = self.clock.now();

        let card = session.begin_answer()?;
        let card_id = card.id();
        let (result, _log_id) = review_service
            .review_card_persisted(card, rating, reviewed_at, self.reviews.as_ref())
            .await?;
        let review = session
            .record_review_result(card_id, result, reviewed_at)?
            .clone();

        if session.is_complete() && session.summary_id().is_none() {
            let finished_at = session.finished_at().ok_or(SessionError::Completed)?;
            let summary = session.build_summary(finished_at)?;
            let summary_id = self.summaries.append_summary(&summary).await?;
            session.set_summary_id(summary_id);
        }

        Ok(SessionAnswerResult {
            review,
            is_complete: session.is_complete(),
            summary_id: session.summary_id(),
        })
    }

    /// Retry summary persistence after a completed session.
    ///
    /// Useful when the final summary append failed on a transient storage
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is not complete, and
    /// `SessionError::Storage` if persistence fails.
    pub async fn finalize_summary(
        &self,
        session: &mut StudySession,
    ) -> Result<i64, SessionError> {
        if let Some(id) = session.summary_id() {
            return Ok(id);
        }

        if !session.is_complete() {
            return Err(SessionError::Completed);
        }

        let finished_at = session.finished_at().ok_or(SessionError::Completed)?;
        let summary = session.build_summary(finished_at)?;
        let id = self.summaries.append_summary(&summary).await?;
        session.set_summary_id(id);
        Ok(id)
    }

    /// The deck's cards as stored right now; used by front-ends for deck
    /// screens without going through a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn deck_cards(
        &self,
        deck_id: DeckId,
    ) -> Result<Vec<srs_core::model::Card>, SessionError> {
        if self.decks.get_deck(deck_id).await?.is_none() {
            return Err(SessionError::Storage(StorageError::NotFound));
        }
        Ok(self.cards.list_cards(deck_id).await?)
    }
}
