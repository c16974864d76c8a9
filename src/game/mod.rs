//! Game Logic Module
//!
//! The round-timing and judgment core. Everything here is pure state
//! manipulation except for the injected clock.
//!
//! ## Module Structure
//!
//! - `clock`: Clock trait, system and test clocks
//! - `history`: Bounded ring buffer of judged outcomes
//! - `state`: Game state, stats, window arithmetic, time formatting
//! - `engine`: The round engine and its operations

pub mod clock;
pub mod engine;
pub mod history;
pub mod state;

// Re-export key types
pub use clock::{Clock, SystemClock};
pub use engine::{EngineError, RoundEngine, RoundOutcome, StartedRound};
pub use history::{History, HistoryEntry};
pub use state::{GameState, Judgment, Outcome, RoundConfig, Stats};
