//! Memory Match Server
//!
//! Hosts one two-player game and exits when both players have left.
//! Configuration comes from `MEMORY_*` environment variables and log
//! filtering from `RUST_LOG`.

use tracing::info;
use tracing_subscriber::EnvFilter;

use memory_match::{
    network::{GameServer, ServerConfig},
    VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Memory Match Server v{}", VERSION);

    let config = ServerConfig::from_env();
    info!("Board: {}, mismatch delay: {:?}", config.board, config.mismatch_delay);

    let server = GameServer::bind(config).await?;
    info!("Waiting for players on {}", server.local_addr()?);

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            shutdown.shutdown();
        }
    });

    let summary = server.run().await?;
    info!("Final: {}", summary.to_json()?);

    Ok(())
}
