//! Client configuration.

use std::time::Duration;

use promproxy_proto::MAX_VALUE_SIZE;

/// Default server address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:3333";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub address: String,

    /// Timeout applied to connect, send, and receive.
    pub timeout: Duration,

    /// Maximum size of a single reply value in bytes.
    pub max_value_size: usize,
}

impl ClientConfig {
    /// Create a configuration for the given address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            max_value_size: MAX_VALUE_SIZE,
        }
    }

    /// Connect to localhost on the default port.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum reply value size.
    pub fn with_max_value_size(mut self, size: usize) -> Self {
        self.max_value_size = size;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}
