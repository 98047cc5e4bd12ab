use rand::rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use srs_core::model::{Card, Deck};

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub cards: Vec<Card>,
    pub due_selected: usize,
    pub new_selected: usize,
}

impl SessionPlan {
    /// Total number of cards in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.cards.len()
    }

    /// Returns true when no cards were selected for this session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Builds a study queue by picking due and new cards per deck settings.
pub struct SessionBuilder<'a> {
    deck: &'a Deck,
    shuffle_new: bool,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(deck: &'a Deck) -> Self {
        Self {
            deck,
            shuffle_new: false,
        }
    }

    /// Enable or disable shuffling among new cards before selection.
    #[must_use]
    pub fn with_shuffle_new(mut self, shuffle: bool) -> Self {
        self.shuffle_new = shuffle;
        self
    }

    /// Build a session plan from storage-provided lists of due and new cards.
    ///
    /// Due cards come first (most overdue leading), then new cards fill the
    /// remaining slots up to `new_cards_per_session`. The whole queue is
    /// capped at `session_limit`.
    pub fn build(
        self,
        due_cards: impl IntoIterator<Item = Card>,
        new_cards: impl IntoIterator<Item = Card>,
    ) -> SessionPlan {
        let settings = self.deck.settings();
        let session_cap = usize::try_from(settings.session_limit).unwrap_or(usize::MAX);
        let new_cap = usize::try_from(settings.new_cards_per_session).unwrap_or(usize::MAX);

        let mut due: Vec<Card> = due_cards.into_iter().collect();
        due.sort_by_key(|c| (c.next_review_at(), c.id().value()));

        let mut selected: Vec<Card> = due.into_iter().take(session_cap).collect();
        let due_selected = selected.len();

        let selected_ids: HashSet<_> = selected.iter().map(Card::id).collect();

        let remaining = session_cap.saturating_sub(selected.len());
        let mut new_selected = 0;
        if remaining > 0 && new_cap > 0 {
            let take = new_cap.min(remaining);
            let mut candidates: Vec<Card> = new_cards
                .into_iter()
                .filter(|c| !selected_ids.contains(&c.id()))
                .collect();

            if self.shuffle_new {
                let mut rng = rng();
                candidates.as_mut_slice().shuffle(&mut rng);
            } else {
                candidates.sort_by_key(|c| (c.created_at(), c.id().value()));
            }

            let picked: Vec<Card> = candidates.into_iter().take(take).collect();
            new_selected = picked.len();
            selected.extend(picked);
        }

        SessionPlan {
            cards: selected,
            due_selected,
            new_selected,
        }
    }
}
