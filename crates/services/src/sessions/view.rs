use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use srs_core::model::{DeckId, RatingCounts, SessionSummary};
use storage::repository::SessionSummaryRepository;

use crate::Clock;
use crate::error::SessionError;

/// Presentation-agnostic list item for a session summary.
///
/// No pre-formatted strings and no localization assumptions; front-ends
/// format timestamps however they like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummaryListItem {
    pub deck_id: DeckId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: u32,
    pub counts: RatingCounts,
}

impl SessionSummaryListItem {
    #[must_use]
    pub fn from_summary(summary: &SessionSummary) -> Self {
        Self {
            deck_id: summary.deck_id(),
            started_at: summary.started_at(),
            finished_at: summary.finished_at(),
            total: summary.total_reviews(),
            counts: summary.counts(),
        }
    }
}

/// Session-history facade that hides repositories and time from front-ends.
#[derive(Clone)]
pub struct SummaryService {
    clock: Clock,
    summaries: Arc<dyn SessionSummaryRepository>,
}

impl SummaryService {
    #[must_use]
    pub fn new(clock: Clock, summaries: Arc<dyn SessionSummaryRepository>) -> Self {
        Self { clock, summaries }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Summaries for a deck, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_summaries(
        &self,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<SessionSummaryListItem>, SessionError> {
        let summaries = self.summaries.summaries_for_deck(deck_id, limit).await?;
        Ok(summaries.iter().map(SessionSummaryListItem::from_summary).collect())
    }

    /// Summaries for a deck finished within the last `days` days, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent_summaries(
        &self,
        deck_id: DeckId,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SessionSummaryListItem>, SessionError> {
        let cutoff = self.clock.now() - Duration::days(days);
        let summaries = self.summaries.summaries_for_deck(deck_id, limit).await?;
        Ok(summaries
            .iter()
            .filter(|s| s.finished_at() >= cutoff)
            .map(SessionSummaryListItem::from_summary)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srs_core::model::{CardId, Rating, ReviewLog};
    use srs_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    #[test]
    fn list_item_carries_raw_counts() {
        let now = fixed_now();
        let logs = vec![ReviewLog::new(CardId::new(1), Rating::Good, now)];
        let summary = SessionSummary::from_logs(DeckId::new(1), now, now, &logs).unwrap();

        let item = SessionSummaryListItem::from_summary(&summary);

        assert_eq!(item.deck_id, DeckId::new(1));
        assert_eq!(item.finished_at, now);
        assert_eq!(item.total, 1);
        assert_eq!(item.counts.good, 1);
    }

    #[tokio::test]
    async fn list_recent_summaries_filters_by_range() {
        let repo = InMemoryRepository::new();
        let deck_id = DeckId::new(1);
        let now = fixed_now();
        let logs = vec![ReviewLog::new(CardId::new(1), Rating::Good, now)];

        let recent = SessionSummary::from_logs(
            deck_id,
            now - Duration::days(2),
            now - Duration::days(1),
            &logs,
        )
        .unwrap();
        let old = SessionSummary::from_logs(
            deck_id,
            now - Duration::days(10),
            now - Duration::days(9),
            &logs,
        )
        .unwrap();

        repo.append_summary(&recent).await.unwrap();
        repo.append_summary(&old).await.unwrap();

        let svc = SummaryService::new(Clock::Fixed(now), Arc::new(repo));
        let items = svc.list_recent_summaries(deck_id, 7, 10).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].finished_at, recent.finished_at());

        let all = svc.list_summaries(deck_id, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].finished_at, recent.finished_at());
    }
}
