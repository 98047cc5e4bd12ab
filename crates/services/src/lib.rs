#![forbid(unsafe_code)]

pub mod error;
pub mod review_service;
pub mod sessions;

pub use srs_core::Clock;

pub use error::{ReviewServiceError, SessionError};
pub use review_service::{PersistedReview, ReviewResult, ReviewService};

pub use sessions::{
    SessionAnswerResult, SessionBuilder, SessionLoopService, SessionPhase, SessionPlan,
    SessionProgress, SessionReview, SessionSummaryListItem, StudySession, SummaryService,
};
