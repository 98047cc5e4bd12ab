mod plan;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{SessionBuilder, SessionPlan};
pub use progress::SessionProgress;
pub use service::{SessionPhase, SessionReview, StudySession};
pub use view::{SessionSummaryListItem, SummaryService};
pub use workflow::{SessionAnswerResult, SessionLoopService};
