//! Server error types.

use promproxy_proto::{MetricKind, Value};
use thiserror::Error;

/// Server errors.
///
/// Only [`Error::Protocol`] and [`Error::Io`] are fatal to a session;
/// everything else is reported to the caller as a wire `Error` value and
/// the connection keeps serving commands.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire input.
    #[error("protocol error: {0}")]
    Protocol(#[from] promproxy_proto::Error),

    /// Wrong arity, wrong argument type, malformed tuple.
    #[error("{0}")]
    Validation(String),

    /// Register against a name already bound to a different kind.
    #[error("metric {name} is already registered as {existing}, not {requested}")]
    KindConflict {
        /// The metric name the conflict occurred on.
        name: String,
        /// The kind the name was first registered with.
        existing: MetricKind,
        /// The kind the failed registration asked for.
        requested: MetricKind,
    },

    /// Record against a name that was never registered.
    #[error("unregistered metric: {0}")]
    NotRegistered(String),

    /// Record with a label set that does not match the descriptor.
    #[error("label mismatch: {0}")]
    LabelMismatch(String),

    /// Any other failure from the metrics engine.
    #[error("engine error: {0}")]
    Engine(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Whether this error must tear the session down instead of being
    /// reported as a reply.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::Io(_))
    }

    /// Render this error as a wire value.
    pub fn to_wire(&self) -> Value {
        Value::error(self)
    }
}
