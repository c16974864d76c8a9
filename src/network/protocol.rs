//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON for debugging ease,
//! with optional binary (bincode) for flat payloads.
//!
//! Field names follow the browser client: `interval` (minutes) and
//! `time_before` (seconds) on the way in; `success`, `interval`,
//! `interval_minutes`, `time_before`, `start_time`, `result`, `message`,
//! `elapsed`, `target_window`, `stats`, `history` and `continue` on the
//! way out.

use serde::{Deserialize, Serialize};

use crate::game::engine::{
    EngineError, RoundOutcome, StartedRound, StatsReport, TimeoutOutcome,
};
use crate::game::history::HistoryEntry;
use crate::game::state::{Outcome, Stats};
use crate::{DEFAULT_INTERVAL_MINUTES, DEFAULT_TIME_BEFORE_SECS};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server. Each variant maps 1:1 to an engine
/// operation, plus `Ping` for latency measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Begin a run with the given timing configuration.
    Start(StartRequest),

    /// Judge a click against the current round.
    Click,

    /// Report that the round elapsed without a click.
    Timeout,

    /// Stop the run, keeping stats and history.
    Reset,

    /// Zero the counters and empty the history.
    ResetStats,

    /// Read current stats and history.
    Stats,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back in the pong.
        timestamp: u64,
    },
}

/// Payload of a `start` command. Both fields are optional on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartRequest {
    /// Round length in minutes (default 1).
    #[serde(default = "default_interval")]
    pub interval: f64,
    /// Acceptance-window width in seconds (default 5).
    #[serde(default = "default_time_before")]
    pub time_before: f64,
}

impl Default for StartRequest {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_MINUTES,
            time_before: DEFAULT_TIME_BEFORE_SECS,
        }
    }
}

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_time_before() -> f64 {
    DEFAULT_TIME_BEFORE_SECS
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A run began.
    Started(StartedInfo),

    /// A round was judged (click or timeout).
    Judged(JudgedInfo),

    /// Acknowledgment for `reset` / `reset_stats`.
    Ack {
        /// Always true; these operations cannot fail.
        success: bool,
    },

    /// Current stats and history.
    StatsReport(StatsInfo),

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server wall-clock time in milliseconds since the Unix epoch.
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Operator-facing reason.
        reason: String,
    },
}

/// Run configuration echoed back by a successful `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartedInfo {
    /// Always true on this message.
    pub success: bool,
    /// Round length in seconds (for window arithmetic on the client).
    pub interval: f64,
    /// Round length in minutes (for display).
    pub interval_minutes: f64,
    /// Acceptance-window width in seconds.
    pub time_before: f64,
    /// Round start as Unix epoch seconds; the client schedules its
    /// countdown off this value.
    pub start_time: f64,
}

impl From<StartedRound> for StartedInfo {
    fn from(r: StartedRound) -> Self {
        Self {
            success: true,
            interval: r.interval_seconds,
            interval_minutes: r.interval_minutes,
            time_before: r.time_before,
            start_time: r.start_time.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

/// A judged outcome. Click judgments carry the elapsed time and window;
/// timeouts omit both (the outcome is unconditional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgedInfo {
    /// Judged result.
    pub result: Outcome,
    /// Human-readable message.
    pub message: String,
    /// Seconds from round start to the click.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    /// Acceptance window `[lower, upper]` for click judgments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_window: Option<[f64; 2]>,
    /// Counters after this outcome.
    pub stats: Stats,
    /// History after this outcome, oldest first.
    pub history: Vec<HistoryEntry>,
    /// The engine rolled over; the client keeps playing.
    #[serde(rename = "continue")]
    pub continue_: bool,
}

impl From<RoundOutcome> for JudgedInfo {
    fn from(o: RoundOutcome) -> Self {
        Self {
            result: o.result,
            message: o.message,
            elapsed: Some(o.elapsed),
            target_window: Some([o.target_window.0, o.target_window.1]),
            stats: o.stats,
            history: o.history,
            continue_: true,
        }
    }
}

impl From<TimeoutOutcome> for JudgedInfo {
    fn from(o: TimeoutOutcome) -> Self {
        Self {
            result: o.result,
            message: o.message,
            elapsed: None,
            target_window: None,
            stats: o.stats,
            history: o.history,
            continue_: true,
        }
    }
}

/// Stats snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsInfo {
    /// Current counters.
    pub stats: Stats,
    /// Current history, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl From<StatsReport> for StatsInfo {
    fn from(r: StatsReport) -> Self {
        Self {
            stats: r.stats,
            history: r.history,
        }
    }
}

/// Server error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Translate an engine error into its wire payload.
    ///
    /// Internal faults map to a generic message; the full detail goes to
    /// the operator log, never to the player.
    pub fn from_engine(err: &EngineError) -> Self {
        match err {
            EngineError::InvalidParameters => Self {
                code: ErrorCode::InvalidParameters,
                message: err.to_string(),
            },
            EngineError::NotRunning => Self {
                code: ErrorCode::NotRunning,
                message: err.to_string(),
            },
            EngineError::Internal(_) => Self {
                code: ErrorCode::Internal,
                message: "internal server error".to_string(),
            },
        }
    }
}

/// Error codes, each with an HTTP-equivalent status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// `start` parameters failed validation.
    InvalidParameters,
    /// `click`/`timeout` with no active round.
    NotRunning,
    /// Malformed or unparseable message.
    InvalidInput,
    /// Unexpected server failure.
    Internal,
}

impl ErrorCode {
    /// HTTP status equivalent (caller errors are 400, faults are 500).
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::InvalidParameters
            | ErrorCode::NotRunning
            | ErrorCode::InvalidInput => 400,
            ErrorCode::Internal => 500,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl StartRequest {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
