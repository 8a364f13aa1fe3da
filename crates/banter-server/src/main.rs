//! # banter
//!
//! Realtime chat relay server.
//!
//! Clients connect to `ws://<host>:<port>/chat/<room>` and speak a small
//! JSON protocol: `join` with a display name, then `chat` lines, which are
//! broadcast to the room. Lines starting with `/` are commands (`/joke`,
//! `/members`, `/priv <name> <message>`).
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! banter
//!
//! # Run with environment variables
//! BANTER_PORT=8080 BANTER_HOST=0.0.0.0 banter
//! ```
//!
//! Configuration is read from `banter.toml` if present (also
//! `/etc/banter/banter.toml` and `~/.config/banter/banter.toml`).

mod config;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting banter server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
