//! Command tag bytes.
//!
//! Every request is an array whose first element is a one-byte string
//! carrying one of these tags; the remaining elements are the command's
//! positional arguments.

/// Register a metric: `[R, name, help, kind, labels, options...]`.
pub const REGISTER: u8 = b'R';

/// Fetch the aggregated exposition text: `[M]`.
pub const METRICS: u8 = b'M';

/// Record an observation: `[C, name, value, label-tuples?]`.
pub const RECORD: u8 = b'C';

/// Close the session: `[X]`.
pub const CLOSE: u8 = b'X';
