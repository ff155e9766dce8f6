//! TCP transport.
//!
//! Accepts connections and runs one independent session task per
//! connection. The registry is the only state the tasks share.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::error::Error;
use crate::registry::MetricRegistry;
use crate::session;

/// Transport counters for monitoring.
#[derive(Debug)]
pub struct TransportMetrics {
    /// Total number of accepted connections.
    pub connections_total: AtomicU64,
    /// Connections currently open.
    pub connections_open: AtomicU64,
    /// Sessions that ended with a protocol or IO failure.
    pub sessions_failed: AtomicU64,
    /// Server start time.
    pub started_at: Instant,
}

impl TransportMetrics {
    fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_open: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Get the uptime duration.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Get total accepted connections.
    pub fn total_connections(&self) -> u64 {
        self.connections_total.load(Ordering::Relaxed)
    }

    /// Get currently open connections.
    pub fn open_connections(&self) -> u64 {
        self.connections_open.load(Ordering::Relaxed)
    }

    /// Get failed session count.
    pub fn failed_sessions(&self) -> u64 {
        self.sessions_failed.load(Ordering::Relaxed)
    }
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Server transport that handles incoming connections.
pub struct Transport {
    listener: TcpListener,
    registry: Arc<MetricRegistry>,
    max_value_size: usize,
    metrics: Arc<TransportMetrics>,
}

impl Transport {
    /// Bind the configured listen address.
    pub async fn bind(
        config: &ServerConfig,
        registry: Arc<MetricRegistry>,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(&config.listen_address).await?;
        tracing::info!(address = %config.listen_address, "listening on TCP");

        Ok(Self {
            listener,
            registry,
            max_value_size: config.max_value_size,
            metrics: Arc::new(TransportMetrics::new()),
        })
    }

    /// Get a reference to the transport metrics.
    pub fn metrics(&self) -> &Arc<TransportMetrics> {
        &self.metrics
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections forever.
    pub async fn run(&self) -> Result<(), Error> {
        loop {
            self.accept_one().await;
        }
    }

    /// Accept and serve connections until the shutdown signal fires.
    ///
    /// In-flight sessions are detached tasks; they finish their current
    /// command and die with the process.
    pub async fn run_until_shutdown(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), Error> {
        tracing::info!("transport ready, accepting connections");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(
                        connections_total = self.metrics.total_connections(),
                        sessions_failed = self.metrics.failed_sessions(),
                        uptime_secs = self.metrics.uptime().as_secs(),
                        "shutdown signal received, stopping transport"
                    );
                    return Ok(());
                }
                _ = self.accept_one() => {}
            }
        }
    }

    async fn accept_one(&self) {
        match self.listener.accept().await {
            Ok((stream, peer)) => self.spawn_session(stream, peer),
            Err(e) => tracing::error!(error = %e, "accept failed"),
        }
    }

    fn spawn_session(&self, mut stream: tokio::net::TcpStream, peer: SocketAddr) {
        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        let max_value_size = self.max_value_size;

        metrics.connections_total.fetch_add(1, Ordering::Relaxed);
        metrics.connections_open.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            tracing::debug!(%peer, "session started");
            match session::run(&mut stream, &registry, max_value_size).await {
                Ok(()) => tracing::debug!(%peer, "session closed"),
                Err(e) => {
                    metrics.sessions_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%peer, error = %e, "session aborted");
                }
            }
            metrics.connections_open.fetch_sub(1, Ordering::Relaxed);
        });
    }
}
