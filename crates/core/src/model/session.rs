use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{DeckId, RatingCounts, ReviewLog};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("total reviews ({total}) does not match rating counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate record of one completed study session.
///
/// Built either from the logs gathered during the session or rehydrated from
/// storage; both paths validate the same invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    deck_id: DeckId,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    total_reviews: u32,
    counts: RatingCounts,
}

impl SessionSummary {
    /// Rehydrate a summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if the session ends
    /// before it starts, or `SessionSummaryError::CountMismatch` if the
    /// stored total does not equal the sum of the rating counts.
    pub fn from_persisted(
        deck_id: DeckId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        total_reviews: u32,
        counts: RatingCounts,
    ) -> Result<Self, SessionSummaryError> {
        if finished_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let sum = counts.total();
        if sum != total_reviews {
            return Err(SessionSummaryError::CountMismatch {
                total: total_reviews,
                sum,
            });
        }

        Ok(Self {
            deck_id,
            started_at,
            finished_at,
            total_reviews,
            counts,
        })
    }

    /// Build a summary from the review logs of one session.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `finished_at` is
    /// before `started_at`.
    pub fn from_logs(
        deck_id: DeckId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        logs: &[ReviewLog],
    ) -> Result<Self, SessionSummaryError> {
        let mut counts = RatingCounts::default();
        for log in logs {
            counts.record(log.rating);
        }
        Self::from_persisted(deck_id, started_at, finished_at, counts.total(), counts)
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn total_reviews(&self) -> u32 {
        self.total_reviews
    }

    #[must_use]
    pub fn counts(&self) -> RatingCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardId, Rating};
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn summary_counts_ratings_from_logs() {
        let now = fixed_now();
        let logs = vec![
            ReviewLog::new(CardId::new(1), Rating::Good, now),
            ReviewLog::new(CardId::new(2), Rating::Again, now),
            ReviewLog::new(CardId::new(3), Rating::Hard, now),
            ReviewLog::new(CardId::new(4), Rating::Easy, now),
            ReviewLog::new(CardId::new(5), Rating::Good, now),
        ];

        let summary =
            SessionSummary::from_logs(DeckId::new(10), now, now + Duration::minutes(5), &logs)
                .unwrap();

        assert_eq!(summary.total_reviews(), 5);
        assert_eq!(summary.counts().again, 1);
        assert_eq!(summary.counts().hard, 1);
        assert_eq!(summary.counts().good, 2);
        assert_eq!(summary.counts().easy, 1);
    }

    #[test]
    fn empty_session_summarizes_to_zero() {
        let now = fixed_now();
        let summary = SessionSummary::from_logs(DeckId::new(1), now, now, &[]).unwrap();
        assert_eq!(summary.total_reviews(), 0);
        assert_eq!(summary.counts(), RatingCounts::default());
    }

    #[test]
    fn rejects_finish_before_start() {
        let now = fixed_now();
        let err =
            SessionSummary::from_logs(DeckId::new(1), now, now - Duration::seconds(1), &[])
                .unwrap_err();
        assert_eq!(err, SessionSummaryError::InvalidTimeRange);
    }

    #[test]
    fn rejects_mismatched_persisted_total() {
        let now = fixed_now();
        let counts = RatingCounts {
            again: 1,
            hard: 0,
            good: 2,
            easy: 0,
        };
        let err = SessionSummary::from_persisted(DeckId::new(1), now, now, 4, counts).unwrap_err();
        assert_eq!(err, SessionSummaryError::CountMismatch { total: 4, sum: 3 });
    }
}
