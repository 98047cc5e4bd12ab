use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, DeckId};
use crate::model::review::ReviewOutcome;
use crate::scheduler::{MIN_EASE_FACTOR, ScheduleState};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CardError {
    #[error("card question must not be empty")]
    EmptyQuestion,
    #[error("card answer must not be empty")]
    EmptyAnswer,
    #[error("ease factor must be >= {MIN_EASE_FACTOR}, got {provided}")]
    InvalidEaseFactor { provided: f64 },
}

//
// ─── CARD ─────────────────────────────────────────────────────────────────────
//

/// A flashcard with its embedded scheduling state.
///
/// Fields are private; construction goes through `new` (fresh card) or
/// `from_persisted` (rehydration from storage), both of which validate, so a
/// `Card` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    id: CardId,
    deck_id: DeckId,
    question: String,
    answer: String,
    created_at: DateTime<Utc>,
    next_review_at: Option<DateTime<Utc>>,
    last_review_at: Option<DateTime<Utc>>,
    schedule: ScheduleState,
}

impl Card {
    /// Creates a brand-new card with fresh scheduling state.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyQuestion` or `CardError::EmptyAnswer` if the
    /// respective text is empty or whitespace-only.
    pub fn new(
        id: CardId,
        deck_id: DeckId,
        question: impl Into<String>,
        answer: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let question = question.into();
        let answer = answer.into();
        if question.trim().is_empty() {
            return Err(CardError::EmptyQuestion);
        }
        if answer.trim().is_empty() {
            return Err(CardError::EmptyAnswer);
        }

        Ok(Self {
            id,
            deck_id,
            question,
            answer,
            created_at,
            next_review_at: None,
            last_review_at: None,
            schedule: ScheduleState::new(),
        })
    }

    /// Rehydrates a card from storage, re-running the same validation as
    /// `new` plus the ease-floor invariant.
    ///
    /// # Errors
    ///
    /// Returns a `CardError` if the stored row violates a model invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: CardId,
        deck_id: DeckId,
        question: String,
        answer: String,
        created_at: DateTime<Utc>,
        next_review_at: Option<DateTime<Utc>>,
        last_review_at: Option<DateTime<Utc>>,
        schedule: ScheduleState,
    ) -> Result<Self, CardError> {
        if question.trim().is_empty() {
            return Err(CardError::EmptyQuestion);
        }
        if answer.trim().is_empty() {
            return Err(CardError::EmptyAnswer);
        }
        if !schedule.ease_factor.is_finite() || schedule.ease_factor < MIN_EASE_FACTOR {
            return Err(CardError::InvalidEaseFactor {
                provided: schedule.ease_factor,
            });
        }

        Ok(Self {
            id,
            deck_id,
            question,
            answer,
            created_at,
            next_review_at,
            last_review_at,
            schedule,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        self.next_review_at
    }

    #[must_use]
    pub fn last_review_at(&self) -> Option<DateTime<Utc>> {
        self.last_review_at
    }

    #[must_use]
    pub fn schedule(&self) -> &ScheduleState {
        &self.schedule
    }

    /// A card is new until its first review is recorded.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.last_review_at.is_none()
    }

    /// A card is due once reviewed at least once and its due time has passed.
    /// New cards are never "due"; they are pulled in separately.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match (self.last_review_at, self.next_review_at) {
            (Some(_), Some(due)) => due <= now,
            _ => false,
        }
    }

    /// Folds a review outcome into the card: scheduling state, due time, and
    /// the last-reviewed stamp all move together.
    pub fn apply_review(&mut self, outcome: &ReviewOutcome, reviewed_at: DateTime<Utc>) {
        self.schedule = ScheduleState::from_outcome(outcome);
        self.next_review_at = Some(outcome.next_review);
        self.last_review_at = Some(reviewed_at);
    }

    /// Replaces the card text. Used by deck editing.
    ///
    /// # Errors
    ///
    /// Same validation as `new`.
    pub fn set_content(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), CardError> {
        let question = question.into();
        let answer = answer.into();
        if question.trim().is_empty() {
            return Err(CardError::EmptyQuestion);
        }
        if answer.trim().is_empty() {
            return Err(CardError::EmptyAnswer);
        }
        self.question = question;
        self.answer = answer;
        Ok(())
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::INITIAL_EASE_FACTOR;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn card() -> Card {
        Card::new(CardId::new(1), DeckId::new(1), "2 + 2?", "4", fixed_now()).unwrap()
    }

    #[test]
    fn new_card_starts_unscheduled() {
        let card = card();
        assert!(card.is_new());
        assert!(!card.is_due(fixed_now()));
        assert_eq!(card.next_review_at(), None);
        assert_eq!(card.schedule().ease_factor, INITIAL_EASE_FACTOR);
        assert_eq!(card.schedule().repetitions, 0);
    }

    #[test]
    fn empty_text_is_rejected() {
        let now = fixed_now();
        assert_eq!(
            Card::new(CardId::new(1), DeckId::new(1), "", "4", now).unwrap_err(),
            CardError::EmptyQuestion
        );
        assert_eq!(
            Card::new(CardId::new(1), DeckId::new(1), "2 + 2?", "   ", now).unwrap_err(),
            CardError::EmptyAnswer
        );
    }

    #[test]
    fn apply_review_moves_due_time_and_stamp_together() {
        let mut card = card();
        let now = fixed_now();
        let outcome = ReviewOutcome::new(now + Duration::days(1), 1, 2.5, 1);

        card.apply_review(&outcome, now);

        assert!(!card.is_new());
        assert_eq!(card.last_review_at(), Some(now));
        assert_eq!(card.next_review_at(), Some(now + Duration::days(1)));
        assert!(!card.is_due(now));
        assert!(card.is_due(now + Duration::days(1)));
        assert!(card.is_due(now + Duration::days(2)));
    }

    #[test]
    fn failed_card_is_due_immediately() {
        let mut card = card();
        let now = fixed_now();
        card.apply_review(&ReviewOutcome::new(now, 0, 2.3, 0), now);

        assert!(card.is_due(now));
    }

    #[test]
    fn from_persisted_rejects_ease_below_floor() {
        let err = Card::from_persisted(
            CardId::new(1),
            DeckId::new(1),
            "q".into(),
            "a".into(),
            fixed_now(),
            None,
            None,
            ScheduleState {
                interval_days: 3,
                ease_factor: 1.1,
                repetitions: 1,
            },
        )
        .unwrap_err();
        assert_eq!(err, CardError::InvalidEaseFactor { provided: 1.1 });
    }

    #[test]
    fn set_content_validates_like_new() {
        let mut card = card();
        assert_eq!(card.set_content("", "x").unwrap_err(), CardError::EmptyQuestion);
        card.set_content("3 + 3?", "6").unwrap();
        assert_eq!(card.question(), "3 + 3?");
        assert_eq!(card.answer(), "6");
    }
}
