//! promproxy server library.
//!
//! This crate provides the server side of the metrics proxy: the typed
//! metric registry, the command dispatcher, the prometheus-backed metrics
//! engine, and the per-connection session loop over TCP.

pub mod command;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod registry;
pub mod session;
pub mod transport;

pub use command::{dispatch, Command, Dispatch};
pub use config::{Args, ServerConfig};
pub use descriptor::{HistogramOptions, MetricDescriptor, MetricSpec, SummaryOptions};
pub use engine::{Engine, MetricHandle};
pub use error::Error;
pub use registry::MetricRegistry;
pub use transport::{Transport, TransportMetrics};
