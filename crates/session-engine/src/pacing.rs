//! Pacing between progress reports.
//!
//! Two strategies are supported:
//!
//! - **Fixed duration**: a plan of waits is drawn once at session start so
//!   that the waits add up to the target reading time.
//! - **Per attempt**: a fixed number of attempts, each wait drawn on demand.
//!
//! Neither strategy ever yields an empty schedule; degenerate input falls
//! back to 120 waits of 30 seconds.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Wait used by the fallback plan.
pub const FALLBACK_INTERVAL_SECS: u64 = 30;
/// Number of waits in the fallback plan.
pub const FALLBACK_INTERVAL_COUNT: usize = 120;
/// Remainders at or below this are folded into the previous wait.
const MIN_TAIL_SECS: u64 = 5;

/// Pacing strategy and its bounds. Intervals are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PacingMode {
    FixedDuration {
        target_minutes: i64,
        min_interval_secs: u64,
        max_interval_secs: u64,
    },
    PerAttempt {
        attempts: u64,
        min_interval_secs: u64,
        max_interval_secs: u64,
    },
}

impl Default for PacingMode {
    fn default() -> Self {
        PacingMode::FixedDuration {
            target_minutes: 60,
            min_interval_secs: 25,
            max_interval_secs: 45,
        }
    }
}

/// The fallback plan: 120 × 30 s.
pub fn fallback_plan() -> Vec<u64> {
    vec![FALLBACK_INTERVAL_SECS; FALLBACK_INTERVAL_COUNT]
}

fn ordered_bounds(min_secs: u64, max_secs: u64) -> (u64, u64) {
    let lo = min_secs.min(max_secs).max(1);
    let hi = min_secs.max(max_secs).max(lo);
    (lo, hi)
}

/// Draw a plan of waits whose sum is the target duration.
///
/// Every wait except the last lies in `[min_secs, max_secs]`. Once the
/// remainder drops below `min_secs` it becomes a short final wait if it is
/// longer than five seconds, otherwise it is folded into the previous wait.
pub fn generate_intervals<R: Rng + ?Sized>(
    total_minutes: i64,
    min_secs: u64,
    max_secs: u64,
    rng: &mut R,
) -> Vec<u64> {
    if total_minutes <= 0 {
        return fallback_plan();
    }

    let (lo, hi) = ordered_bounds(min_secs, max_secs);
    let total = total_minutes.unsigned_abs().saturating_mul(60);
    let mut intervals = Vec::new();
    let mut current = 0u64;

    while current < total {
        let remaining = total - current;
        if remaining < lo {
            match intervals.last_mut() {
                Some(last) if remaining <= MIN_TAIL_SECS => *last += remaining,
                _ => intervals.push(remaining),
            }
            break;
        }

        let interval = rng.gen_range(lo..=hi).min(remaining);
        intervals.push(interval);
        current += interval;
    }

    if intervals.is_empty() {
        return fallback_plan();
    }
    intervals
}

/// Decides how long to wait after each successful report and when the
/// session is done.
#[derive(Debug, Clone)]
pub struct PacingScheduler {
    mode: PacingMode,
    plan: VecDeque<u64>,
    planned: u64,
    issued: u64,
    elapsed: Duration,
}

impl PacingScheduler {
    /// Build the schedule. Fixed-duration plans are drawn here, once.
    pub fn new<R: Rng + ?Sized>(mode: PacingMode, rng: &mut R) -> Self {
        let (plan, planned) = match &mode {
            PacingMode::FixedDuration {
                target_minutes,
                min_interval_secs,
                max_interval_secs,
            } => {
                let plan =
                    generate_intervals(*target_minutes, *min_interval_secs, *max_interval_secs, rng);
                let planned = plan.len() as u64;
                (VecDeque::from(plan), planned)
            }
            PacingMode::PerAttempt { attempts, .. } => {
                let planned = if *attempts == 0 {
                    FALLBACK_INTERVAL_COUNT as u64
                } else {
                    *attempts
                };
                (VecDeque::new(), planned)
            }
        };

        Self {
            mode,
            plan,
            planned,
            issued: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn mode(&self) -> &PacingMode {
        &self.mode
    }

    /// Total attempts scheduled at start.
    pub fn planned_attempts(&self) -> u64 {
        self.planned
    }

    /// Attempts still to be made.
    pub fn remaining_attempts(&self) -> u64 {
        self.planned.saturating_sub(self.issued)
    }

    /// Sum of all waits handed out so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Waits not yet handed out (fixed-duration plans only).
    pub fn remaining_plan(&self) -> impl Iterator<Item = u64> + '_ {
        self.plan.iter().copied()
    }

    /// Consume the next wait. `None` once the schedule is exhausted.
    pub fn next_wait<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Duration> {
        if self.remaining_attempts() == 0 {
            return None;
        }

        let secs = match &self.mode {
            PacingMode::FixedDuration { .. } => self.plan.pop_front()?,
            PacingMode::PerAttempt {
                min_interval_secs,
                max_interval_secs,
                ..
            } => {
                let (lo, hi) = ordered_bounds(*min_interval_secs, *max_interval_secs);
                rng.gen_range(lo..=hi)
            }
        };

        self.issued += 1;
        let wait = Duration::from_secs(secs);
        self.elapsed += wait;
        Some(wait)
    }
}
