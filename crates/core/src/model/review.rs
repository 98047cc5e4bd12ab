use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CardId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when handling review input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid rating value: {0} (expected 1-4)")]
    InvalidRating(u8),
}

//
// ─── RATING ───────────────────────────────────────────────────────────────────
//

/// Four-level recall-quality rating, ordinal 1-4.
///
/// - `Again`: failed to recall, the card becomes due immediately
/// - `Hard`: recalled with significant difficulty
/// - `Good`: recalled correctly
/// - `Easy`: recalled instantly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Converts a numeric rating (1-4) to a `Rating`.
    ///
    /// Values outside 1-4 are a caller contract violation and fail with
    /// `ReviewError::InvalidRating`; they are never clamped.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidRating` if the value is not in 1-4.
    pub fn from_u8(value: u8) -> Result<Self, ReviewError> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            _ => Err(ReviewError::InvalidRating(value)),
        }
    }

    /// Maps this rating back to its 1-4 ordinal.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Rating::Again => 1,
            Rating::Hard => 2,
            Rating::Good => 3,
            Rating::Easy => 4,
        }
    }

    /// Lowercase label, used in wire payloads and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

//
// ─── RATING COUNTS ────────────────────────────────────────────────────────────
//

/// Per-rating counters for a study session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl RatingCounts {
    /// Record one review with the given rating.
    pub fn record(&mut self, rating: Rating) {
        let slot = match rating {
            Rating::Again => &mut self.again,
            Rating::Hard => &mut self.hard,
            Rating::Good => &mut self.good,
            Rating::Easy => &mut self.easy,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.again
            .saturating_add(self.hard)
            .saturating_add(self.good)
            .saturating_add(self.easy)
    }
}

//
// ─── REVIEW LOG ───────────────────────────────────────────────────────────────
//

/// Record of a single card review: which card, when, and what rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLog {
    pub card_id: CardId,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLog {
    #[must_use]
    pub fn new(card_id: CardId, rating: Rating, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            card_id,
            rating,
            reviewed_at,
        }
    }
}

//
// ─── REVIEW OUTCOME ───────────────────────────────────────────────────────────
//

/// Output of the scheduling algorithm for one rating.
///
/// Contains the card's next scheduling state and the derived due timestamp.
/// `next_review` is always computed here; callers never set it directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub next_review: DateTime<Utc>,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
}

impl ReviewOutcome {
    #[must_use]
    pub fn new(
        next_review: DateTime<Utc>,
        interval_days: u32,
        ease_factor: f64,
        repetitions: u32,
    ) -> Self {
        Self {
            next_review,
            interval_days,
            ease_factor,
            repetitions,
        }
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_rating_conversion_round_trips() {
        for value in 1..=4_u8 {
            let rating = Rating::from_u8(value).unwrap();
            assert_eq!(rating.as_u8(), value);
        }
    }

    #[test]
    fn out_of_range_rating_is_rejected_not_clamped() {
        assert_eq!(Rating::from_u8(0).unwrap_err(), ReviewError::InvalidRating(0));
        assert_eq!(Rating::from_u8(5).unwrap_err(), ReviewError::InvalidRating(5));
        assert_eq!(
            Rating::from_u8(255).unwrap_err(),
            ReviewError::InvalidRating(255)
        );
    }

    #[test]
    fn rating_counts_accumulate() {
        let mut counts = RatingCounts::default();
        counts.record(Rating::Good);
        counts.record(Rating::Good);
        counts.record(Rating::Again);
        counts.record(Rating::Easy);

        assert_eq!(counts.good, 2);
        assert_eq!(counts.again, 1);
        assert_eq!(counts.hard, 0);
        assert_eq!(counts.easy, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn log_creation_works() {
        let now = Utc::now();
        let log = ReviewLog::new(CardId::new(7), Rating::Hard, now);
        assert_eq!(log.card_id, CardId::new(7));
        assert_eq!(log.rating, Rating::Hard);
        assert_eq!(log.reviewed_at, now);
    }
}
