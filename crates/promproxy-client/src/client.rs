//! promproxy client API.
//!
//! This module provides the main `Client` struct for registering and
//! recording metrics on a promproxy server.

use tokio::sync::Mutex;

use promproxy_proto::{command, MetricKind, Value};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Error;

/// A client for a promproxy server.
///
/// # Example
///
/// ```ignore
/// use promproxy_client::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::connect(ClientConfig::localhost()).await?;
///
///     client.register_counter("requests", "total requests", &["code"]).await?;
///     client.record("requests", 1.0, &[("code", "200")]).await?;
///
///     let exposition = client.metrics().await?;
///     println!("{exposition}");
///
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    connection: Mutex<Connection>,
}

impl Client {
    /// Connect to a promproxy server.
    pub async fn connect(config: ClientConfig) -> Result<Self, Error> {
        let connection = Connection::establish(config).await?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Connect to a server at the given address.
    pub async fn connect_to(address: impl Into<String>) -> Result<Self, Error> {
        Self::connect(ClientConfig::new(address)).await
    }

    /// Connect to localhost on the default port.
    pub async fn connect_localhost() -> Result<Self, Error> {
        Self::connect(ClientConfig::localhost()).await
    }

    /// Register a counter.
    pub async fn register_counter(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<(), Error> {
        let request = register_request(MetricKind::Counter, name, help, labels, vec![]);
        self.expect_ok(&request).await
    }

    /// Register a gauge.
    pub async fn register_gauge(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<(), Error> {
        let request = register_request(MetricKind::Gauge, name, help, labels, vec![]);
        self.expect_ok(&request).await
    }

    /// Register a histogram. Pass no buckets to use the engine defaults.
    pub async fn register_histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: &[f64],
    ) -> Result<(), Error> {
        let options = if buckets.is_empty() {
            vec![]
        } else {
            vec![Value::array(
                buckets.iter().map(|b| bulk(&b.to_string())).collect(),
            )]
        };
        let request = register_request(MetricKind::Histogram, name, help, labels, options);
        self.expect_ok(&request).await
    }

    /// Register a summary. Pass no objectives to track only sum and count.
    pub async fn register_summary(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        objectives: &[(f64, f64)],
    ) -> Result<(), Error> {
        let options = if objectives.is_empty() {
            vec![]
        } else {
            vec![Value::array(
                objectives
                    .iter()
                    .map(|(q, e)| {
                        Value::array(vec![bulk(&q.to_string()), bulk(&e.to_string())])
                    })
                    .collect(),
            )]
        };
        let request = register_request(MetricKind::Summary, name, help, labels, options);
        self.expect_ok(&request).await
    }

    /// Record an observation. Labels may be empty.
    pub async fn record(
        &self,
        name: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<(), Error> {
        let mut parts = vec![
            tag(command::RECORD),
            bulk(name),
            bulk(&value.to_string()),
        ];
        if !labels.is_empty() {
            parts.push(Value::array(
                labels
                    .iter()
                    .map(|(k, v)| Value::array(vec![bulk(k), bulk(v)]))
                    .collect(),
            ));
        }
        self.expect_ok(&Value::array(parts)).await
    }

    /// Fetch the aggregated exposition text.
    pub async fn metrics(&self) -> Result<String, Error> {
        let reply = self
            .connection
            .lock()
            .await
            .round_trip(&Value::array(vec![tag(command::METRICS)]))
            .await?;
        match reply {
            Value::Error(msg) => Err(Error::Server(msg)),
            other => other
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::UnexpectedReply(format!("{other:?}"))),
        }
    }

    /// Close the session and wait for the server to hang up.
    pub async fn close(self) -> Result<(), Error> {
        let mut connection = self.connection.into_inner();
        let reply = connection
            .round_trip(&Value::array(vec![tag(command::CLOSE)]))
            .await?;
        if let Value::Error(msg) = reply {
            return Err(Error::Server(msg));
        }
        connection.drain().await
    }

    async fn expect_ok(&self, request: &Value) -> Result<(), Error> {
        let reply = self.connection.lock().await.round_trip(request).await?;
        match reply {
            Value::Simple(s) if s == "ok" => Ok(()),
            Value::Error(msg) => Err(Error::Server(msg)),
            other => Err(Error::UnexpectedReply(format!("{other:?}"))),
        }
    }
}

fn tag(byte: u8) -> Value {
    Value::bulk(vec![byte])
}

fn bulk(s: &str) -> Value {
    Value::bulk(s.as_bytes().to_vec())
}

fn register_request(
    kind: MetricKind,
    name: &str,
    help: &str,
    labels: &[&str],
    options: Vec<Value>,
) -> Value {
    let mut parts = vec![
        tag(command::REGISTER),
        bulk(name),
        bulk(help),
        tag(kind.tag()),
        Value::array(labels.iter().map(|l| bulk(l)).collect()),
    ];
    parts.extend(options);
    Value::array(parts)
}
