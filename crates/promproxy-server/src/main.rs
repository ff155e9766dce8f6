//! promproxy server - standalone metrics proxy daemon.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promproxy_server::{Args, MetricRegistry, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promproxy_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting promproxy server"
    );

    // Parse command-line arguments
    let args = Args::parse();
    let config = args.into_config();

    tracing::info!(
        listen = %config.listen_address,
        namespace = %config.namespace,
        max_value_size = config.max_value_size,
        "configuration loaded"
    );

    // One registry per server instance, shared by every connection
    let registry = Arc::new(MetricRegistry::new(config.namespace.clone()));

    // Bind the transport
    let transport = Transport::bind(&config, registry).await?;

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx_clone.send(());
    });

    // Serve
    match transport.run_until_shutdown(shutdown_rx).await {
        Ok(()) => {
            tracing::info!("server shutdown complete");
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            return Err(e.into());
        }
    }

    Ok(())
}
