//! Clock Seam
//!
//! The wall clock is the only non-pure input of the round engine. It sits
//! behind a trait so the timing logic stays testable: production code uses
//! [`SystemClock`], tests drive a [`ManualClock`] by hand.

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic timing tests.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    /// Create a clock frozen at the Unix epoch.
    pub fn epoch() -> Self {
        Self::at(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Advance the clock by a number of seconds (fractional allowed).
    pub fn advance_secs(&self, secs: f64) {
        let delta = chrono::Duration::microseconds((secs * 1_000_000.0).round() as i64);
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
