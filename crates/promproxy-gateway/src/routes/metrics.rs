//! Scrape endpoint.

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::AppError;
use crate::AppState;

/// Content type of the text exposition format.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Scrape routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(scrape))
}

/// Fetch the aggregated exposition text from the promproxy server.
async fn scrape(State(state): State<AppState>) -> Result<Response, AppError> {
    let text = state.client.metrics().await?;
    Ok(([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], text).into_response())
}
