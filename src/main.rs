use std::time::Duration;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = sockbus_settings::load_settings().context("loading settings")?;
    settings.validate().context("validating settings")?;
    tracing::info!(driver = settings.bus.driver.as_str(), "starting sockbus gateway");

    // The one process-fatal failure: no bus, no gateway.
    let bus = sockbus_bus::connect(&settings.bus)
        .await
        .context("constructing bus driver")?;

    let handle = sockbus_server::start(&settings, bus)
        .await
        .context("starting server")?;
    tracing::info!(port = handle.port(), "sockbus gateway ready");

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl+c")?;
    tracing::info!("shutdown signal received");

    handle.shutdown();
    let grace = Duration::from_millis(settings.server.graceful_timeout_ms);
    if tokio::time::timeout(grace, handle.stopped()).await.is_err() {
        tracing::warn!("graceful shutdown timed out");
    }
    Ok(())
}
