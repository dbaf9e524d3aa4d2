//! channel-relay server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use channel_relay::app_state::AppState;
use channel_relay::config::{LogFormat, RelayConfig};
use channel_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting channel-relay");

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    // Build relay state and serve
    let state = AppState::new(config);
    server::serve(listener, state).await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
