//! Top-level facade crate for promproxy.
//!
//! Re-exports the wire protocol types and the client library so users can
//! depend on a single crate.

pub mod proto {
    pub use promproxy_proto::*;
}

pub mod client {
    pub use promproxy_client::*;
}

pub use promproxy_client::{Client, ClientConfig};
pub use promproxy_proto::{MetricKind, Value};
