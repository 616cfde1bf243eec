mod bootstrap;
mod crm;
mod health;

use anyhow::Result;
use leadvox_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use leadvox_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.context_store.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "leadvox-server started, polling for updates"
    );

    tokio::select! {
        result = app.bot_runner.start() => {
            result?;
            tracing::info!(
                event_name = "system.server.update_stream_ended",
                correlation_id = "shutdown",
                "telegram update stream ended"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                "shutdown signal received"
            );
        }
    }

    Ok(())
}
