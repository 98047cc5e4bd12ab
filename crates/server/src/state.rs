use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use services::{Clock, SessionLoopService, StudySession, SummaryService};
use storage::repository::Storage;

/// Shared application state handed to every handler.
///
/// Active study sessions live in process memory keyed by an opaque UUID;
/// only their results (cards, logs, summaries) are persisted.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Mutex<HashMap<Uuid, StudySession>>>,
    pub session_loop: Arc<SessionLoopService>,
    pub summaries: Arc<SummaryService>,
}

impl AppState {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        let session_loop = SessionLoopService::new(
            clock,
            Arc::clone(&storage.decks),
            Arc::clone(&storage.cards),
            Arc::clone(&storage.reviews),
            Arc::clone(&storage.summaries),
        )
        .with_shuffle_new(true);
        let summaries = SummaryService::new(clock, Arc::clone(&storage.summaries));

        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_loop: Arc::new(session_loop),
            summaries: Arc::new(summaries),
        }
    }
}
