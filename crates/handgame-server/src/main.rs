//! handgame server entry point.
//!
//! Configuration comes from the environment:
//!
//! - `HANDGAME_BIND`: listen address (default `127.0.0.1:8080`)
//! - `HANDGAME_SWEEP_SECS`: if set, end elapsed rooms every N seconds
//! - `RUST_LOG`: tracing filter (default `info`)

use std::time::Duration;

use anyhow::Context;
use handgame::{DEFAULT_BIND_ADDR, HandgameServer};
use handgame_room::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Config {
    bind: String,
    sweep: Option<Duration>,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let bind = std::env::var("HANDGAME_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
        let sweep = match std::env::var("HANDGAME_SWEEP_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("HANDGAME_SWEEP_SECS must be whole seconds, got {raw:?}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => None,
        };
        Ok(Self { bind, sweep })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let mut builder = HandgameServer::builder().bind(&config.bind);
    if let Some(interval) = config.sweep {
        builder = builder.sweep_interval(interval);
    }
    let server = builder
        .build(MemoryStore::new())
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(
        addr = %server.local_addr()?,
        sweep = ?config.sweep,
        "listening for participants on /room"
    );
    server.run().await?;
    Ok(())
}
