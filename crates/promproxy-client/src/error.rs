//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] promproxy_proto::Error),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an error value.
    #[error("server error: {0}")]
    Server(String),

    /// The server answered with a value the client did not expect.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}
