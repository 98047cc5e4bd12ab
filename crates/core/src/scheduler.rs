use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CardId, Rating, ReviewLog, ReviewOutcome};

/// Lower bound for a card's ease factor. Ease never falls below this,
/// preventing runaway shortening of intervals.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor assigned to a card that has never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("ease floor must be positive and finite, got {provided}")]
    InvalidEaseFloor { provided: f64 },
    #[error("interval growth factor must be >= 1.0, got {provided}")]
    InvalidIntervalFactor { provided: f64 },
}

//
// ─── SCHEDULE STATE ────────────────────────────────────────────────────────────
//

/// Serializable per-card scheduling state.
///
/// Stored with each `Card` and fed back into the scheduler on the next
/// review. A brand-new card starts at `{interval_days: 0, ease_factor: 2.5,
/// repetitions: 0}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Days until the card is next due. Zero means due immediately.
    pub interval_days: u32,
    /// Growth multiplier for the interval; never below `MIN_EASE_FACTOR`.
    pub ease_factor: f64,
    /// Consecutive successful (non-"again") reviews; reset on failure.
    pub repetitions: u32,
}

impl ScheduleState {
    /// State for a card that has never been reviewed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval_days: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            repetitions: 0,
        }
    }

    #[must_use]
    pub fn from_outcome(outcome: &ReviewOutcome) -> Self {
        Self {
            interval_days: outcome.interval_days,
            ease_factor: outcome.ease_factor,
            repetitions: outcome.repetitions,
        }
    }
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── SCHEDULED STATES ──────────────────────────────────────────────────────────
//

/// All four possible next states for a card, one per rating.
///
/// Computed up front so a front-end can show the would-be interval on each
/// rating button; pick the actual outcome with `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledStates {
    pub again: ReviewOutcome,
    pub hard: ReviewOutcome,
    pub good: ReviewOutcome,
    pub easy: ReviewOutcome,
}

impl ScheduledStates {
    #[must_use]
    pub fn select(&self, rating: Rating) -> &ReviewOutcome {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Tuning knobs for the scheduling algorithm.
///
/// Defaults are the SM-2-family constants this tool has always used. The
/// config exists so a more sophisticated model can sit behind the same
/// `Scheduler` interface without changing the session layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub ease_floor: f64,
    pub again_ease_penalty: f64,
    pub hard_ease_penalty: f64,
    pub easy_ease_bonus: f64,
    pub hard_interval_factor: f64,
    pub easy_interval_factor: f64,
    pub first_good_interval_days: u32,
    pub first_easy_interval_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ease_floor: MIN_EASE_FACTOR,
            again_ease_penalty: 0.2,
            hard_ease_penalty: 0.15,
            easy_ease_bonus: 0.15,
            hard_interval_factor: 1.2,
            easy_interval_factor: 1.3,
            first_good_interval_days: 1,
            first_easy_interval_days: 4,
        }
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Spaced-repetition scheduler.
///
/// Pure and deterministic: given the same scheduling state, rating, and
/// timestamp it always produces the same result. Time is injected by the
/// caller; the scheduler never reads a system clock.
///
/// # Examples
///
/// ```
/// # use srs_core::scheduler::{ScheduleState, Scheduler};
/// # use srs_core::model::{CardId, Rating};
/// let scheduler = Scheduler::new();
/// let now = chrono::Utc::now();
///
/// let applied = scheduler.apply_review(
///     CardId::new(1),
///     &ScheduleState::new(),
///     Rating::Good,
///     now,
/// );
/// assert_eq!(applied.state.interval_days, 1);
/// assert_eq!(applied.state.repetitions, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

/// Outcome of applying a review: log entry, chosen schedule, and the new state.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReview {
    pub log: ReviewLog,
    pub outcome: ReviewOutcome,
    pub state: ScheduleState,
}

impl Scheduler {
    /// Create a scheduler with the default constants.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    /// Create a scheduler with custom tuning.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidEaseFloor` if the floor is not
    /// positive and finite, or `SchedulerError::InvalidIntervalFactor` if a
    /// growth factor would shrink intervals.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        if !config.ease_floor.is_finite() || config.ease_floor <= 0.0 {
            return Err(SchedulerError::InvalidEaseFloor {
                provided: config.ease_floor,
            });
        }
        for factor in [config.hard_interval_factor, config.easy_interval_factor] {
            if !factor.is_finite() || factor < 1.0 {
                return Err(SchedulerError::InvalidIntervalFactor { provided: factor });
            }
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Compute all four possible next states for a card.
    #[must_use]
    pub fn preview(&self, state: &ScheduleState, now: DateTime<Utc>) -> ScheduledStates {
        ScheduledStates {
            again: self.rate(state, Rating::Again, now),
            hard: self.rate(state, Rating::Hard, now),
            good: self.rate(state, Rating::Good, now),
            easy: self.rate(state, Rating::Easy, now),
        }
    }

    /// Apply a user's rating and return the chosen schedule, the new state,
    /// and a log entry for the review.
    ///
    /// Defined via `preview` + `select` so the two can never disagree.
    #[must_use]
    pub fn apply_review(
        &self,
        card_id: CardId,
        state: &ScheduleState,
        rating: Rating,
        reviewed_at: DateTime<Utc>,
    ) -> AppliedReview {
        let outcome = self.preview(state, reviewed_at).select(rating).clone();
        let state = ScheduleState::from_outcome(&outcome);
        let log = ReviewLog::new(card_id, rating, reviewed_at);

        AppliedReview {
            log,
            outcome,
            state,
        }
    }

    /// Transition one scheduling state under one rating.
    ///
    /// - again: repetitions reset, interval 0, ease down 0.2 (floored); due now
    /// - hard: ease down 0.15 (floored), interval * 1.2, at least 1 day
    /// - good: ease unchanged; first success gives 1 day, then interval * ease
    /// - easy: ease up 0.15; first success gives 4 days, then interval * ease * 1.3
    fn rate(&self, state: &ScheduleState, rating: Rating, now: DateTime<Utc>) -> ReviewOutcome {
        let cfg = &self.config;

        let (interval_days, ease_factor, repetitions) = match rating {
            Rating::Again => {
                let ease = (state.ease_factor - cfg.again_ease_penalty).max(cfg.ease_floor);
                (0, ease, 0)
            }
            Rating::Hard => {
                let ease = (state.ease_factor - cfg.hard_ease_penalty).max(cfg.ease_floor);
                let interval =
                    round_days(f64::from(state.interval_days) * cfg.hard_interval_factor).max(1);
                (interval, ease, state.repetitions.saturating_add(1))
            }
            Rating::Good => {
                let repetitions = state.repetitions.saturating_add(1);
                let interval = if repetitions == 1 {
                    cfg.first_good_interval_days
                } else {
                    round_days(f64::from(state.interval_days) * state.ease_factor)
                };
                (interval, state.ease_factor, repetitions)
            }
            Rating::Easy => {
                let repetitions = state.repetitions.saturating_add(1);
                let ease = state.ease_factor + cfg.easy_ease_bonus;
                let interval = if repetitions == 1 {
                    cfg.first_easy_interval_days
                } else {
                    round_days(f64::from(state.interval_days) * ease * cfg.easy_interval_factor)
                };
                (interval, ease, repetitions)
            }
        };

        let next_review = now + Duration::days(i64::from(interval_days));

        ReviewOutcome::new(next_review, interval_days, ease_factor, repetitions)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_days(days: f64) -> u32 {
    if days <= 0.0 {
        return 0;
    }
    if days >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    days.round() as u32
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
