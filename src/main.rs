//! greenhill-cockpit - HTTP Server Entry Point
//!
//! Starts the orchestration server that front-ends call with `POST /invoke`.

use greenhill_cockpit::{api, config::Config};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenhill_cockpit=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, state_file={}",
        config.provider.default_model,
        config.state_file.display()
    );
    if !config.provider.is_configured() {
        warn!("OPENAI_API_KEY is not set; every dispatch will answer in degraded mode");
    }
    match &config.evidence_log {
        Some(path) => info!("Evidence log: {}", path.display()),
        None => info!("Evidence logging disabled"),
    }

    api::serve(config).await?;

    Ok(())
}
