//! Round Engine
//!
//! Owns the game state and implements the timing, judgment, rollover and
//! aggregation logic behind the five externally callable operations:
//! `start`, `click`, `timeout`, `reset`, `reset_stats` (plus the pure
//! `stats` read).
//!
//! The engine is synchronous and lock-free; concurrent access is the
//! transport's concern (it wraps the engine in a single `RwLock`, so every
//! mutating operation runs as an atomic critical section).

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::game::clock::{Clock, SystemClock};
use crate::game::history::HistoryEntry;
use crate::game::state::{GameState, Judgment, Outcome, RoundConfig, Stats};

/// Errors produced by engine operations. State is never mutated on an
/// error path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// `start` rejected its parameters; resubmit corrected values.
    #[error("invalid parameters: interval must be > 0 and 0 < time_before < interval")]
    InvalidParameters,

    /// `click`/`timeout` called with no active round; call `start` first.
    #[error("game not running")]
    NotRunning,

    /// Unexpected failure. Full detail belongs in the operator log, not in
    /// the payload shown to players.
    #[error("internal fault: {0}")]
    Internal(String),
}

/// Result of a successful `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedRound {
    /// Round length in seconds.
    pub interval_seconds: f64,
    /// Round length as configured, in minutes.
    pub interval_minutes: f64,
    /// Acceptance-window width in seconds.
    pub time_before: f64,
    /// Instant the first round began.
    pub start_time: DateTime<Utc>,
}

/// Result of a judged `click`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    /// Judged result.
    pub result: Outcome,
    /// Human-readable message embedding the elapsed time.
    pub message: String,
    /// Seconds from round start to the click.
    pub elapsed: f64,
    /// Acceptance window `[lower, upper]` the click was judged against.
    pub target_window: (f64, f64),
    /// Counters after this outcome.
    pub stats: Stats,
    /// History after this outcome, oldest first.
    pub history: Vec<HistoryEntry>,
}

/// Result of a `timeout`. Always a fail; no elapsed-time detail because the
/// outcome is unconditional, not derived from a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutOutcome {
    /// Always [`Outcome::Fail`].
    pub result: Outcome,
    /// Human-readable message.
    pub message: String,
    /// Counters after this outcome.
    pub stats: Stats,
    /// History after this outcome, oldest first.
    pub history: Vec<HistoryEntry>,
}

/// Snapshot returned by the pure `stats` read.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    /// Current counters.
    pub stats: Stats,
    /// Current history, oldest first.
    pub history: Vec<HistoryEntry>,
}

/// The round-timing and judgment state machine.
///
/// Generic over its clock so tests can drive time deterministically;
/// production code uses the [`SystemClock`] default.
#[derive(Debug)]
pub struct RoundEngine<C: Clock = SystemClock> {
    state: GameState,
    clock: C,
}

impl RoundEngine<SystemClock> {
    /// Create an engine on the system clock, in the stopped state.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RoundEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RoundEngine<C> {
    /// Create an engine with an injected clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: GameState::new(),
            clock,
        }
    }

    /// Whether a round is currently active.
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Read-only view of the full state (used by tests and diagnostics).
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Clock access for tests that drive time by hand.
    #[cfg(test)]
    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    /// Begin a run: install timing configuration and start the first round.
    ///
    /// `interval_minutes` is converted to seconds; validation requires
    /// `interval_minutes > 0`, `time_before_secs > 0` and
    /// `time_before_secs < interval_seconds` (NaN fails all three).
    /// Overwrites any in-flight round; stats and history carry over.
    pub fn start(
        &mut self,
        interval_minutes: f64,
        time_before_secs: f64,
    ) -> Result<StartedRound, EngineError> {
        let interval_seconds = interval_minutes * 60.0;

        let valid = interval_minutes > 0.0
            && time_before_secs > 0.0
            && time_before_secs < interval_seconds;
        if !valid {
            return Err(EngineError::InvalidParameters);
        }

        let config = RoundConfig {
            interval_seconds,
            interval_minutes,
            time_before: time_before_secs,
        };
        let start_time = self.clock.now();

        self.state.config = Some(config);
        self.state.start_time = Some(start_time);
        self.state.running = true;

        debug!(
            interval_seconds,
            time_before = time_before_secs,
            "round started"
        );

        Ok(StartedRound {
            interval_seconds,
            interval_minutes,
            time_before: time_before_secs,
            start_time,
        })
    }

    /// Judge a click against the current round's acceptance window.
    ///
    /// Always rolls the round over afterwards; the engine never stops
    /// itself. An arbitrarily late click still judges "too late" - an
    /// external timer is responsible for calling [`RoundEngine::timeout`].
    pub fn click(&mut self) -> Result<RoundOutcome, EngineError> {
        let (config, start_time) = self.active_round()?;

        let now = self.clock.now();
        let elapsed = (now - start_time).as_seconds_f64();
        let judgment = config.judge_click(elapsed);

        let (stats, history) = self.settle(judgment, now);

        debug!(elapsed, ?judgment, "click judged");

        Ok(RoundOutcome {
            result: judgment.outcome(),
            message: judgment.message(elapsed),
            elapsed,
            target_window: config.window(),
            stats,
            history,
        })
    }

    /// Record that the round elapsed without a click. Unconditionally a
    /// fail; the caller is trusted to invoke it only when the window has
    /// truly passed. Rolls the round over like a failing click.
    pub fn timeout(&mut self) -> Result<TimeoutOutcome, EngineError> {
        self.active_round()?;

        let now = self.clock.now();
        let judgment = Judgment::TimedOut;
        let (stats, history) = self.settle(judgment, now);

        debug!("round timed out");

        Ok(TimeoutOutcome {
            result: judgment.outcome(),
            message: judgment.message(0.0),
            stats,
            history,
        })
    }

    /// Stop the run. Idempotent; stats and history are preserved.
    pub fn reset(&mut self) {
        self.state.running = false;
        self.state.start_time = None;
        debug!("game reset");
    }

    /// Zero the counters and empty the history. Idempotent and independent
    /// of whether a round is active.
    pub fn reset_stats(&mut self) {
        self.state.stats.clear();
        self.state.history.clear();
        debug!("stats reset");
    }

    /// Pure read of the current counters and history.
    pub fn stats(&self) -> StatsReport {
        StatsReport {
            stats: self.state.stats,
            history: self.state.history.snapshot(),
        }
    }

    /// Guard: the config and start time of the active round, or NotRunning.
    fn active_round(&self) -> Result<(RoundConfig, DateTime<Utc>), EngineError> {
        if !self.state.running {
            return Err(EngineError::NotRunning);
        }
        match (self.state.config, self.state.start_time) {
            (Some(config), Some(start_time)) => Ok((config, start_time)),
            // running implies both are set; anything else is a state bug.
            _ => Err(EngineError::Internal(
                "running without config or start time".to_string(),
            )),
        }
    }

    /// Record a judged outcome and roll over to the next round.
    fn settle(&mut self, judgment: Judgment, now: DateTime<Utc>) -> (Stats, Vec<HistoryEntry>) {
        let outcome = judgment.outcome();
        self.state.stats.record(outcome);
        self.state.history.push(outcome, now);
        // Rollover: next round starts immediately, run state untouched.
        self.state.start_time = Some(now);
        (self.state.stats, self.state.history.snapshot())
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod properties {
    use super::*;
    use crate::game::clock::ManualClock;
    use proptest::prelude::*;

    proptest! {
        /// Boundary-inclusive window classification for arbitrary valid
        /// configurations.
        #[test]
        fn window_classification(
            interval_seconds in 1.0f64..3600.0,
            frac in 0.01f64..0.99,
            eps in 1e-6f64..10.0,
        ) {
            let time_before = interval_seconds * frac;
            let config = RoundConfig {
                interval_seconds,
                interval_minutes: interval_seconds / 60.0,
                time_before,
            };
            let (lower, upper) = config.window();

            prop_assume!(lower - eps < lower);
            prop_assume!(upper + eps > upper);

            prop_assert_eq!(config.judge_click(lower), Judgment::Success);
            prop_assert_eq!(config.judge_click(upper), Judgment::Success);
            prop_assert_eq!(config.judge_click(lower - eps), Judgment::TooEarly);
            prop_assert_eq!(config.judge_click(upper + eps), Judgment::TooLate);
        }

        /// total == success + fail after any sequence of clicks and
        /// timeouts, and history never exceeds its bound.
        #[test]
        fn counter_and_history_invariants(
            ops in prop::collection::vec((0u8..2, 0.0f64..90.0), 1..300),
        ) {
            let mut e = RoundEngine::with_clock(ManualClock::epoch());
            e.start(1.0, 5.0).unwrap();

            for (op, advance_secs) in ops {
                e.clock().advance_secs(advance_secs);
                match op {
                    0 => { e.click().unwrap(); }
                    _ => { e.timeout().unwrap(); }
                }

                let report = e.stats();
                prop_assert_eq!(
                    report.stats.total,
                    report.stats.success + report.stats.fail
                );
                prop_assert!(report.history.len() <= crate::HISTORY_CAPACITY);
                prop_assert!(e.is_running());
            }
        }

        /// After >= capacity outcomes, history holds exactly the most
        /// recent ones in chronological order.
        #[test]
        fn history_holds_most_recent(extra in 0usize..80) {
            let mut e = RoundEngine::with_clock(ManualClock::epoch());
            e.start(1.0, 5.0).unwrap();

            let total = crate::HISTORY_CAPACITY + extra;
            for _ in 0..total {
                e.clock().advance_secs(1.0);
                e.timeout().unwrap();
            }

            let history = e.stats().history;
            prop_assert_eq!(history.len(), crate::HISTORY_CAPACITY);
            prop_assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

            // Newest entry matches the last rollover instant.
            prop_assert_eq!(
                history.last().unwrap().timestamp,
                e.state().start_time.unwrap()
            );
        }
    }
}
