mod card;
mod deck;
mod ids;
mod review;
mod session;

pub use card::{Card, CardError};
pub use deck::{Deck, DeckError, DeckSettings};
pub use ids::{CardId, DeckId, ParseIdError};
pub use review::{Rating, RatingCounts, ReviewError, ReviewLog, ReviewOutcome};
pub use session::{SessionSummary, SessionSummaryError};
