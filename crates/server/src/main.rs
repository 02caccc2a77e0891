mod activity;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use helpline_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

use crate::activity::ActivityUpdater;

fn init_logging(config: &AppConfig) {
    use helpline_core::config::LogFormat::*;

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let updater = ActivityUpdater::new(app.services.clone(), app.guilds.clone(), &app.config.help_system);
    let activity_task = updater
        .spawn(Duration::from_secs(app.config.help_system.activity_update_interval_secs));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        forum_pattern = %app.config.help_system.forum_pattern,
        "helpline-server started"
    );

    tokio::select! {
        result = app.gateway.start() => {
            result?;
            tracing::info!(
                event_name = "system.gateway.closed",
                correlation_id = "gateway",
                "gateway event stream closed; waiting for shutdown signal"
            );
            wait_for_shutdown().await?;
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = app.config.server.graceful_shutdown_secs,
        "helpline-server stopping"
    );

    activity_task.abort();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(grace, app.db_pool.close()).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "database pool did not close within the grace period"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
