//! promproxy client library.
//!
//! An async client for the promproxy wire protocol: register metrics,
//! record observations, and fetch the aggregated exposition text from a
//! running server.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use client::Client;
pub use config::ClientConfig;
pub use connection::Connection;
pub use error::Error;
