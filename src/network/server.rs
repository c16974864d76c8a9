//! WebSocket Game Server
//!
//! Async WebSocket front door for the round engine. Accepts connections,
//! decodes commands, dispatches each one to the engine under its lock, and
//! serializes the result back.
//!
//! The engine holds the single process-wide game; every connected client
//! talks to the same state. Mutating commands take the write lock so each
//! read-modify-write runs as one atomic critical section; the stats read
//! shares the read lock.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::game::clock::Clock;
use crate::game::engine::{EngineError, RoundEngine};
use crate::network::protocol::{
    ClientMessage, ErrorCode, ServerError, ServerMessage,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Drop connections idle longer than this.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults: `TEMPO_CLICK_BIND`, `TEMPO_CLICK_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, GameServerError> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("TEMPO_CLICK_BIND") {
            config.bind_addr = bind.parse().map_err(|_| {
                GameServerError::Config(format!("invalid TEMPO_CLICK_BIND: {bind}"))
            })?;
        }
        if let Ok(max) = std::env::var("TEMPO_CLICK_MAX_CONNECTIONS") {
            config.max_connections = max.parse().map_err(|_| {
                GameServerError::Config(format!("invalid TEMPO_CLICK_MAX_CONNECTIONS: {max}"))
            })?;
        }

        Ok(config)
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection id for logging.
    id: Uuid,
    /// Last activity.
    last_activity: Instant,
    /// Message sender (for direct messaging to client).
    #[allow(dead_code)]
    sender: mpsc::Sender<ServerMessage>,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The one shared game, behind its critical-section lock.
    engine: Arc<RwLock<RoundEngine>>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server with a fresh, stopped game.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            engine: Arc::new(RwLock::new(RoundEngine::new())),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            "Game server v{} listening on {}",
            self.config.version, self.config.bind_addr
        );

        // Spawn idle-connection cleanup task
        let cleanup_clients = self.clients.clone();
        let idle_timeout = self.config.idle_timeout;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let engine = self.engine.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let conn_id = Uuid::new_v4();
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    id: conn_id,
                    last_activity: Instant::now(),
                    sender: msg_tx.clone(),
                });
            }

            debug!("Connection {} registered as {}", addr, conn_id);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", conn_id, e);
                                        let _ = msg_tx.send(ServerMessage::Error(ServerError {
                                            code: ErrorCode::InvalidInput,
                                            message: "Invalid message format".to_string(),
                                        })).await;
                                        continue;
                                    }
                                };

                                // Update activity
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                let reply = dispatch(&engine, client_msg).await;
                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Ping(_))) => {
                                // tungstenite answers the frame itself; just
                                // refresh activity.
                                let mut clients = clients.write().await;
                                if let Some(client) = clients.get_mut(&addr) {
                                    client.last_activity = Instant::now();
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", conn_id);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", conn_id, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();

            {
                let mut clients = clients.write().await;
                clients.remove(&addr);
            }

            info!("Client {} cleaned up", conn_id);
        });
    }

    /// Run the idle-connection cleanup loop.
    async fn run_cleanup_loop(
        clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        idle_timeout: Duration,
    ) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            let now = Instant::now();
            let to_remove: Vec<_> = {
                let clients = clients.read().await;
                clients.iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, _)| *addr)
                    .collect()
            };

            for addr in to_remove {
                let mut clients = clients.write().await;
                if let Some(client) = clients.remove(&addr) {
                    info!("Removed idle client {}", client.id);
                }
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether a round is currently active.
    pub async fn is_running(&self) -> bool {
        self.engine.read().await.is_running()
    }
}

/// Dispatch one decoded command to the engine and build the reply.
///
/// Mutating commands take the write lock; `Stats` takes the read lock.
/// Engine errors become error payloads with the matching code; internal
/// faults log full detail here and surface only a generic message.
pub async fn dispatch<C: Clock>(
    engine: &RwLock<RoundEngine<C>>,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Start(req) => {
            let result = engine.write().await.start(req.interval, req.time_before);
            match result {
                Ok(started) => ServerMessage::Started(started.into()),
                Err(e) => engine_error_reply(e),
            }
        }
        ClientMessage::Click => {
            let result = engine.write().await.click();
            match result {
                Ok(outcome) => ServerMessage::Judged(outcome.into()),
                Err(e) => engine_error_reply(e),
            }
        }
        ClientMessage::Timeout => {
            let result = engine.write().await.timeout();
            match result {
                Ok(outcome) => ServerMessage::Judged(outcome.into()),
                Err(e) => engine_error_reply(e),
            }
        }
        ClientMessage::Reset => {
            engine.write().await.reset();
            ServerMessage::Ack { success: true }
        }
        ClientMessage::ResetStats => {
            engine.write().await.reset_stats();
            ServerMessage::Ack { success: true }
        }
        ClientMessage::Stats => {
            let report = engine.read().await.stats();
            ServerMessage::StatsReport(report.into())
        }
        ClientMessage::Ping { timestamp } => ServerMessage::Pong {
            timestamp,
            server_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        },
    }
}

/// Translate an engine error into its reply, logging faults in full.
fn engine_error_reply(err: EngineError) -> ServerMessage {
    if let EngineError::Internal(detail) = &err {
        error!("Engine fault: {}", detail);
    } else {
        debug!("Rejected command: {}", err);
    }
    ServerMessage::Error(ServerError::from_engine(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::ManualClock;
    use crate::game::state::Outcome;
    use crate::network::protocol::StartRequest;

    fn test_engine() -> RwLock<RoundEngine<ManualClock>> {
        RwLock::new(RoundEngine::with_clock(ManualClock::epoch()))
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        assert!(!server.is_running().await);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_dispatch_start_then_click() {
        let engine = test_engine();

        let reply = dispatch(
            &engine,
            ClientMessage::Start(StartRequest {
                interval: 1.0,
                time_before: 5.0,
            }),
        )
        .await;
        match reply {
            ServerMessage::Started(info) => {
                assert!(info.success);
                assert_eq!(info.interval, 60.0);
                assert_eq!(info.interval_minutes, 1.0);
            }
            other => panic!("Expected Started, got {:?}", other),
        }

        {
            let e = engine.read().await;
            e.clock().advance_secs(57.0);
        }

        let reply = dispatch(&engine, ClientMessage::Click).await;
        match reply {
            ServerMessage::Judged(info) => {
                assert_eq!(info.result, Outcome::Success);
                assert!(info.continue_);
                assert_eq!(info.target_window, Some([55.0, 60.0]));
            }
            other => panic!("Expected Judged, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_click_before_start_is_rejected() {
        let engine = test_engine();

        let reply = dispatch(&engine, ClientMessage::Click).await;
        match reply {
            ServerMessage::Error(err) => {
                assert_eq!(err.code, ErrorCode::NotRunning);
                assert_eq!(err.code.status(), 400);
            }
            other => panic!("Expected Error, got {:?}", other),
        }

        // Rejection left nothing behind.
        let reply = dispatch(&engine, ClientMessage::Stats).await;
        match reply {
            ServerMessage::StatsReport(info) => {
                assert_eq!(info.stats.total, 0);
                assert!(info.history.is_empty());
            }
            other => panic!("Expected StatsReport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_invalid_start_parameters() {
        let engine = test_engine();

        let reply = dispatch(
            &engine,
            ClientMessage::Start(StartRequest {
                interval: 0.0,
                time_before: 5.0,
            }),
        )
        .await;
        match reply {
            ServerMessage::Error(err) => {
                assert_eq!(err.code, ErrorCode::InvalidParameters);
            }
            other => panic!("Expected Error, got {:?}", other),
        }
        assert!(!engine.read().await.is_running());
    }

    #[tokio::test]
    async fn test_dispatch_timeout_and_reset_cycle() {
        let engine = test_engine();
        dispatch(
            &engine,
            ClientMessage::Start(StartRequest::default()),
        )
        .await;

        let reply = dispatch(&engine, ClientMessage::Timeout).await;
        match reply {
            ServerMessage::Judged(info) => {
                assert_eq!(info.result, Outcome::Fail);
                assert!(info.elapsed.is_none());
            }
            other => panic!("Expected Judged, got {:?}", other),
        }

        let reply = dispatch(&engine, ClientMessage::Reset).await;
        assert!(matches!(reply, ServerMessage::Ack { success: true }));
        assert!(!engine.read().await.is_running());

        // Stats survive reset, die with reset_stats.
        let reply = dispatch(&engine, ClientMessage::Stats).await;
        match reply {
            ServerMessage::StatsReport(info) => assert_eq!(info.stats.total, 1),
            other => panic!("Expected StatsReport, got {:?}", other),
        }

        dispatch(&engine, ClientMessage::ResetStats).await;
        let reply = dispatch(&engine, ClientMessage::Stats).await;
        match reply {
            ServerMessage::StatsReport(info) => {
                assert_eq!(info.stats.total, 0);
                assert!(info.history.is_empty());
            }
            other => panic!("Expected StatsReport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_ping() {
        let engine = test_engine();
        let reply = dispatch(&engine, ClientMessage::Ping { timestamp: 42 }).await;
        match reply {
            ServerMessage::Pong { timestamp, server_time } => {
                assert_eq!(timestamp, 42);
                assert!(server_time > 0);
            }
            other => panic!("Expected Pong, got {:?}", other),
        }
    }
}
