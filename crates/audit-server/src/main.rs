use anyhow::Context;
use audit_logging::AuditSubscriberBuilder;
use audit_server::{Cli, ServerConfig, open_service, router};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    // Flushes file logs on drop
    let _guard = AuditSubscriberBuilder::new()
        .with_config(config.logging.clone())
        .try_init()?;

    let service = open_service(&config)
        .await
        .context("Failed to open event store")?;

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Event audit server listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Event audit server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
