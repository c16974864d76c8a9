//! # Tempo Click Game Server
//!
//! Reaction-timing game: a countdown of fixed length repeats forever, and the
//! player must register a click inside a narrow acceptance window at the end
//! of each period.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TEMPO CLICK SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Round timing and judgment (the core)      │
//! │  ├── clock.rs    - Clock seam (system time behind a trait)   │
//! │  ├── history.rs  - Bounded ring buffer of judged outcomes    │
//! │  ├── state.rs    - Game state, stats, window arithmetic      │
//! │  └── engine.rs   - RoundEngine: start/click/timeout/reset    │
//! │                                                              │
//! │  network/        - Transport (thin shim over the engine)     │
//! │  ├── server.rs   - WebSocket server                          │
//! │  └── protocol.rs - Message types                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timing Model
//!
//! A round runs from `start_time` for `interval_seconds`; the acceptance
//! window is the trailing `[interval - time_before, interval]` sub-interval,
//! inclusive at both ends. Every judged outcome (click or timeout) rolls the
//! round over immediately - the engine never stops itself, only an explicit
//! `reset` does. The wall clock is the single non-pure input and sits behind
//! the [`game::clock::Clock`] trait so tests can drive time by hand.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::clock::{Clock, SystemClock};
pub use game::engine::{EngineError, RoundEngine};
pub use game::history::{History, HistoryEntry};
pub use game::state::{GameState, Outcome, RoundConfig, Stats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of judged outcomes retained in history
pub const HISTORY_CAPACITY: usize = 100;

/// Default round length when the client sends none (minutes)
pub const DEFAULT_INTERVAL_MINUTES: f64 = 1.0;

/// Default acceptance-window width when the client sends none (seconds)
pub const DEFAULT_TIME_BEFORE_SECS: f64 = 5.0;
