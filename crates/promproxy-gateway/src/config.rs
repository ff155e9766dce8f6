//! Gateway configuration.

use std::time::Duration;

use clap::Parser;

/// promproxy HTTP gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "promproxy-gateway")]
#[command(version, about = "HTTP scrape gateway for promproxy", long_about = None)]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Address of the promproxy server.
    #[arg(short, long, default_value = "127.0.0.1:3333")]
    pub server: String,

    /// Upstream request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Address of the promproxy server.
    pub server_addr: String,
    /// Upstream request timeout.
    pub timeout: Duration,
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            server_addr: args.server.clone(),
            timeout: Duration::from_millis(args.timeout_ms),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            server_addr: "127.0.0.1:3333".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}
