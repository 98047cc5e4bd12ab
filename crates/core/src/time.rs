use chrono::{DateTime, TimeZone, Utc};

/// Timestamp used by `fixed_now`: 2024-01-01T00:00:00Z.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_704_067_200;

/// Clock abstraction so scheduling and session code never read the system
/// clock directly. Production uses `Clock::Default`; tests pin time with
/// `Clock::Fixed` to make due-date assertions exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::Default
    }
}

/// A fixed, well-known instant for tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(FIXED_TEST_TIMESTAMP, 0).unwrap()
}
