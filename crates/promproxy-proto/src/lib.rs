//! promproxy wire protocol types and codec.
//!
//! This crate defines the RESP-style value grammar the proxy speaks and a
//! streaming codec for it.
//!
//! # Modules
//!
//! - [`value`] - The wire value tree
//! - [`codec`] - Incremental decode and bit-exact encode
//! - [`kind`] - Metric kinds and their one-byte wire tags
//! - [`command`] - Command tag bytes
//! - [`error`] - Protocol error types
//!
//! # Wire format
//!
//! Each value begins with a one-byte type tag and ends with CRLF:
//!
//! ```text
//! +ok\r\n                  simple string
//! -unregistered\r\n        error
//! :42\r\n                  integer
//! $5\r\nhello\r\n          bulk string (binary-safe, length-prefixed)
//! *2\r\n+a\r\n+b\r\n       array of two values
//! $-1\r\n                  null
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod kind;
pub mod value;

pub use codec::{decode, decode_with_limit, encode, encode_to_vec, MAX_VALUE_SIZE};
pub use error::Error;
pub use kind::MetricKind;
pub use value::Value;
