//! promproxy HTTP gateway binary.

use clap::Parser;
use promproxy_client::{Client, ClientConfig};
use promproxy_gateway::{create_router, AppState, Args, GatewayConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promproxy_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        server = %config.server_addr,
        "starting promproxy gateway"
    );

    // Connect to the promproxy server
    let client_config =
        ClientConfig::new(&config.server_addr).with_timeout(config.timeout);
    let client = Client::connect(client_config).await?;
    info!("connected to promproxy server");

    // Create application state and router
    let state = AppState::new(client, config.clone());
    let app = create_router(state);

    // Start serving
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
