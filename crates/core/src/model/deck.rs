use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::DeckId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck name must not be empty")]
    EmptyName,
    #[error("session limit must be at least 1")]
    ZeroSessionLimit,
}

//
// ─── SETTINGS ─────────────────────────────────────────────────────────────────
//

/// Per-deck study settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSettings {
    /// Maximum number of cards pulled into one study session.
    pub session_limit: u32,
    /// Of those, how many may be never-reviewed cards.
    pub new_cards_per_session: u32,
}

impl DeckSettings {
    /// # Errors
    ///
    /// Returns `DeckError::ZeroSessionLimit` if `session_limit` is zero.
    pub fn new(session_limit: u32, new_cards_per_session: u32) -> Result<Self, DeckError> {
        if session_limit == 0 {
            return Err(DeckError::ZeroSessionLimit);
        }
        Ok(Self {
            session_limit,
            new_cards_per_session: new_cards_per_session.min(session_limit),
        })
    }
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            session_limit: 50,
            new_cards_per_session: 20,
        }
    }
}

//
// ─── DECK ─────────────────────────────────────────────────────────────────────
//

/// A named collection of cards with its study settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    id: DeckId,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    settings: DeckSettings,
}

impl Deck {
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if the name is empty or whitespace-only.
    pub fn new(
        id: DeckId,
        name: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
        settings: DeckSettings,
    ) -> Result<Self, DeckError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DeckError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            description: description.into(),
            created_at,
            settings,
        })
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn settings(&self) -> DeckSettings {
        self.settings
    }

    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if the new name is empty.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DeckError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DeckError::EmptyName);
        }
        self.name = name;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_settings(&mut self, settings: DeckSettings) {
        self.settings = settings;
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn default_settings_match_documented_limits() {
        let settings = DeckSettings::default();
        assert_eq!(settings.session_limit, 50);
        assert_eq!(settings.new_cards_per_session, 20);
    }

    #[test]
    fn new_card_limit_is_capped_by_session_limit() {
        let settings = DeckSettings::new(10, 30).unwrap();
        assert_eq!(settings.new_cards_per_session, 10);
    }

    #[test]
    fn zero_session_limit_is_rejected() {
        assert_eq!(DeckSettings::new(0, 5).unwrap_err(), DeckError::ZeroSessionLimit);
    }

    #[test]
    fn deck_name_must_be_nonempty() {
        let err = Deck::new(
            DeckId::new(1),
            "  ",
            "",
            fixed_now(),
            DeckSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, DeckError::EmptyName);

        let mut deck = Deck::new(
            DeckId::new(1),
            "Arithmetic",
            "basic sums",
            fixed_now(),
            DeckSettings::default(),
        )
        .unwrap();
        assert_eq!(deck.rename("").unwrap_err(), DeckError::EmptyName);
        deck.rename("Algebra").unwrap();
        assert_eq!(deck.name(), "Algebra");
    }
}
