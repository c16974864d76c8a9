//! Network Layer
//!
//! WebSocket transport over the round engine. This layer is a thin shim -
//! all game logic runs through `game/`.

pub mod protocol;
pub mod server;

pub use protocol::{
    ClientMessage, ErrorCode, JudgedInfo, ServerError, ServerMessage,
    StartRequest, StartedInfo, StatsInfo,
};
pub use server::{dispatch, GameServer, GameServerError, ServerConfig};
