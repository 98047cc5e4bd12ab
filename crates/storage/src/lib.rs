#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CardRepository, DeckRepository, InMemoryRepository, NewDeckRecord, ReviewLogRecord,
    ReviewLogRepository, ReviewPersistence, SessionSummaryRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
