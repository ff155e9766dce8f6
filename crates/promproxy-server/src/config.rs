//! Server configuration.

use clap::Parser;

use promproxy_proto::MAX_VALUE_SIZE;

/// Default TCP listen address.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:3333";

/// Default namespace prefixed onto every metric name. Empty means no
/// prefix.
pub const DEFAULT_NAMESPACE: &str = "";

/// promproxy server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP address to bind to (e.g., "0.0.0.0:3333").
    pub listen_address: String,

    /// Namespace applied to every registered metric.
    pub namespace: String,

    /// Maximum size of a single wire value in bytes.
    pub max_value_size: usize,
}

impl ServerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_value_size: MAX_VALUE_SIZE,
        }
    }

    /// Set the listen address.
    pub fn with_listen_address(mut self, address: impl Into<String>) -> Self {
        self.listen_address = address.into();
        self
    }

    /// Set the metric namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the maximum wire value size.
    pub fn with_max_value_size(mut self, size: usize) -> Self {
        self.max_value_size = size;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "promproxy-server")]
#[command(version, about = "Prometheus metrics proxy server", long_about = None)]
pub struct Args {
    /// TCP address to bind to.
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen: String,

    /// Namespace prefixed onto every metric name.
    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Maximum wire value size in kilobytes.
    #[arg(long, default_value_t = MAX_VALUE_SIZE / 1024)]
    pub max_value_kb: usize,
}

impl Args {
    /// Convert command-line arguments to server configuration.
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen_address: self.listen,
            namespace: self.namespace,
            max_value_size: self.max_value_kb * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_address, DEFAULT_LISTEN_ADDRESS);
        assert_eq!(config.namespace, "");
        assert_eq!(config.max_value_size, MAX_VALUE_SIZE);
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new()
            .with_listen_address("127.0.0.1:9999")
            .with_namespace("app")
            .with_max_value_size(1024);

        assert_eq!(config.listen_address, "127.0.0.1:9999");
        assert_eq!(config.namespace, "app");
        assert_eq!(config.max_value_size, 1024);
    }

    #[test]
    fn test_args_into_config() {
        let args = Args {
            listen: "127.0.0.1:3333".into(),
            namespace: "ns".into(),
            max_value_kb: 16,
        };
        let config = args.into_config();
        assert_eq!(config.listen_address, "127.0.0.1:3333");
        assert_eq!(config.namespace, "ns");
        assert_eq!(config.max_value_size, 16 * 1024);
    }
}
