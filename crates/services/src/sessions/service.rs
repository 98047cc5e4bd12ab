use chrono::{DateTime, Utc};
use std::fmt;

use srs_core::model::{Card, CardId, Deck, DeckId, DeckSettings, Rating, RatingCounts, SessionSummary};

use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::review_service::{ReviewResult, ReviewService};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where the session stands with the current card.
///
/// Each card passes through `ShowingQuestion` then `ShowingAnswer`; a rating
/// may only be submitted once the answer has been revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    ShowingQuestion,
    ShowingAnswer,
}

//
// ─── REVIEW RESULT WITH CARD ───────────────────────────────────────────────────
//

/// Outcome of reviewing one card within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReview {
    pub card_id: CardId,
    pub result: ReviewResult,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory study session for a deck.
///
/// Steps through a pre-selected queue of cards one at a time. For each card
/// the caller reveals the answer, then submits a rating; the session applies
/// the rating via `ReviewService` and advances. Constructing a session with
/// at least one card means it is started; there is no idle state.
pub struct StudySession {
    deck_id: DeckId,
    deck_settings: DeckSettings,
    cards: Vec<Card>,
    current: usize,
    phase: SessionPhase,
    results: Vec<SessionReview>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    summary_id: Option<i64>,
}

impl StudySession {
    /// Create a session over an already-selected card queue.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no cards are provided.
    pub fn new(
        deck: &Deck,
        cards: Vec<Card>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            deck_id: deck.id(),
            deck_settings: deck.settings(),
            cards,
            current: 0,
            phase: SessionPhase::ShowingQuestion,
            results: Vec::new(),
            started_at,
            finished_at: None,
            summary_id: None,
        })
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn deck_settings(&self) -> DeckSettings {
        self.deck_settings
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    #[must_use]
    pub fn results(&self) -> &[SessionReview] {
        &self.results
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_cards(),
            completed: self.completed_count(),
            remaining: self.remaining(),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        self.cards.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Per-rating tallies for the answers given so far.
    #[must_use]
    pub fn counts(&self) -> RatingCounts {
        let mut counts = RatingCounts::default();
        for review in &self.results {
            counts.record(review.result.applied.log.rating);
        }
        counts
    }

    /// Reveal the current card's answer and move to the rating phase.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if no card remains, or
    /// `SessionError::AlreadyRevealed` if the answer is already showing.
    pub fn reveal_answer(&mut self) -> Result<&str, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if self.phase == SessionPhase::ShowingAnswer {
            return Err(SessionError::AlreadyRevealed);
        }
        let card = self.cards.get(self.current).ok_or(SessionError::Completed)?;
        self.phase = SessionPhase::ShowingAnswer;
        Ok(card.answer())
    }

    /// Apply a rating to the current card and advance the session.
    ///
    /// `reviewed_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already finished
    /// and `SessionError::AnswerNotRevealed` if the answer has not been
    /// shown for the current card.
    pub fn answer_current(
        &mut self,
        review_service: &ReviewService,
        rating: Rating,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&SessionReview, SessionError> {
        let (card_id, result) = {
            let card = self.begin_answer()?;
            let id = card.id();
            let result = review_service.review_card(card, rating, reviewed_at);
            (id, result)
        };

        self.record_review_result(card_id, result, reviewed_at)
    }

    /// Validate phase and hand out the current card for mutation.
    ///
    /// Callers that persist the review externally use this, then feed the
    /// result back through `record_review_result`.
    pub(crate) fn begin_answer(&mut self) -> Result<&mut Card, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if self.phase != SessionPhase::ShowingAnswer {
            return Err(SessionError::AnswerNotRevealed);
        }
        self.cards
            .get_mut(self.current)
            .ok_or(SessionError::Completed)
    }

    pub(crate) fn record_review_result(
        &mut self,
        card_id: CardId,
        result: ReviewResult,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&SessionReview, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }

        self.results.push(SessionReview { card_id, result });

        self.current += 1;
        self.phase = SessionPhase::ShowingQuestion;
        if self.current >= self.cards.len() {
            self.finished_at = Some(reviewed_at);
        }

        self.results.last().ok_or(SessionError::Completed)
    }

    pub(crate) fn build_summary(
        &self,
        finished_at: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        let logs: Vec<_> = self
            .results
            .iter()
            .map(|review| review.result.applied.log.clone())
            .collect();
        Ok(SessionSummary::from_logs(
            self.deck_id,
            self.started_at,
            finished_at,
            &logs,
        )?)
    }

    pub(crate) fn set_summary_id(&mut self, id: i64) {
        self.summary_id = Some(id);
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("deck_id", &self.deck_id)
            .field("cards_len", &self.cards.len())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("results_len", &self.results.len())
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .field("summary_id", &self.summary_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
