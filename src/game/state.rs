//! Game State Definitions
//!
//! State types for the round-timing game: the judged outcome, running
//! counters, round configuration with its window arithmetic, and the
//! process-wide game state the engine owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::history::History;

// =============================================================================
// OUTCOME & JUDGMENT
// =============================================================================

/// Judged result of a round, as recorded in stats and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Click landed inside the acceptance window.
    Success,
    /// Click outside the window, or the round timed out.
    Fail,
}

/// How a round ended. Carries more detail than [`Outcome`]: which side of
/// the window a failing click fell on, or whether the round timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    /// Clicked inside the window.
    Success,
    /// Clicked before the window opened.
    TooEarly,
    /// Clicked after the window closed. There is no staleness cutoff: a
    /// click arriving minutes late is still judged here, not rejected.
    TooLate,
    /// The caller reported the window elapsed without a click.
    TimedOut,
}

impl Judgment {
    /// Collapse to the recorded outcome.
    pub fn outcome(self) -> Outcome {
        match self {
            Judgment::Success => Outcome::Success,
            Judgment::TooEarly | Judgment::TooLate | Judgment::TimedOut => Outcome::Fail,
        }
    }

    /// Human-readable message for this judgment.
    ///
    /// Click judgments embed the elapsed time as `minutes:seconds`, seconds
    /// zero-padded to 2 integer and 2 fraction digits (e.g. `0:05.32`).
    pub fn message(self, elapsed_secs: f64) -> String {
        match self {
            Judgment::Success => {
                format!("Success! You clicked at {}", format_clock(elapsed_secs))
            }
            Judgment::TooEarly => {
                format!("Too early! You clicked at {}", format_clock(elapsed_secs))
            }
            Judgment::TooLate => {
                format!("Too late! You clicked at {}", format_clock(elapsed_secs))
            }
            Judgment::TimedOut => "Time's up! You didn't click in time.".to_string(),
        }
    }
}

/// Render elapsed seconds as `minutes:seconds` (`0:57.00`, `1:05.32`).
pub fn format_clock(elapsed_secs: f64) -> String {
    let mins = (elapsed_secs / 60.0).floor() as u64;
    let secs = elapsed_secs % 60.0;
    format!("{}:{:05.2}", mins, secs)
}

// =============================================================================
// STATS
// =============================================================================

/// Running outcome counters.
///
/// Invariant: `total == success + fail` at every observable point; counters
/// only grow while a run is active and only [`Stats::clear`] resets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Rounds judged (clicks plus timeouts).
    pub total: u64,
    /// Rounds judged success.
    pub success: u64,
    /// Rounds judged fail.
    pub fail: u64,
}

impl Stats {
    /// Count one judged outcome.
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Fail => self.fail += 1,
        }
    }

    /// Reset all counters to zero.
    pub fn clear(&mut self) {
        *self = Stats::default();
    }
}

// =============================================================================
// ROUND CONFIGURATION
// =============================================================================

/// Timing configuration of a run. Immutable once installed by `start`;
/// changing it requires a new `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Round length in seconds.
    pub interval_seconds: f64,
    /// Round length as configured, in minutes (kept for display).
    pub interval_minutes: f64,
    /// Acceptance-window width in seconds (`0 < time_before < interval_seconds`).
    pub time_before: f64,
}

impl RoundConfig {
    /// Acceptance window `[interval - time_before, interval]`, inclusive
    /// at both ends.
    pub fn window(&self) -> (f64, f64) {
        (self.interval_seconds - self.time_before, self.interval_seconds)
    }

    /// Judge a click by its elapsed time against the window.
    pub fn judge_click(&self, elapsed_secs: f64) -> Judgment {
        let (lower, upper) = self.window();
        if elapsed_secs < lower {
            Judgment::TooEarly
        } else if elapsed_secs > upper {
            Judgment::TooLate
        } else {
            Judgment::Success
        }
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of the game. One instance per process, exclusively owned
/// by the engine.
///
/// `running == true` implies `config` and `start_time` are set.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Whether a round is active.
    pub running: bool,
    /// Timing configuration of the current run (while running).
    pub config: Option<RoundConfig>,
    /// Instant the current round began (while running).
    pub start_time: Option<DateTime<Utc>>,
    /// Running outcome counters.
    pub stats: Stats,
    /// Bounded log of the most recent judged outcomes.
    pub history: History,
}

impl GameState {
    /// Create the initial stopped state: no round, zero stats, empty history.
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// TESTS
// =============================================================================
