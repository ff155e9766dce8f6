//! Error handling for the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Communication with the promproxy server failed.
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, message).into_response()
    }
}

impl From<promproxy_client::Error> for AppError {
    fn from(err: promproxy_client::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}
