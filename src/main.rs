//! Tempo Click Game Server
//!
//! Serves the single process-wide reaction-timing game over WebSocket.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tempo_click::network::{GameServer, ServerConfig};
use tempo_click::{DEFAULT_INTERVAL_MINUTES, DEFAULT_TIME_BEFORE_SECS, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = ServerConfig::from_env().context("Failed to load server configuration")?;

    info!("Tempo Click Server v{}", VERSION);
    info!(
        "Defaults: interval {} min, window {} s before the end",
        DEFAULT_INTERVAL_MINUTES, DEFAULT_TIME_BEFORE_SECS
    );
    info!("Binding to {}", config.bind_addr);

    let server = GameServer::new(config);
    server.run().await.context("Server exited with error")?;

    Ok(())
}
