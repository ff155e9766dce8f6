//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
///
/// Any of these is fatal to the connection it occurred on: the codec does
/// not attempt to resynchronize a corrupted stream.
#[derive(Debug, Error)]
pub enum Error {
    /// The value began with a byte that is not a known type tag.
    #[error("unknown type tag: 0x{0:02x}")]
    UnknownTag(u8),

    /// A length or integer field was not valid decimal text.
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// A negative length other than the -1 null sentinel.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// Structurally malformed input.
    #[error("malformed value: {0}")]
    Malformed(String),

    /// A declared length exceeds the hardening limit.
    #[error("declared size {size} exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },
}
