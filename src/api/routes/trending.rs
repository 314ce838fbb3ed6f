//! Trending list handler.

use crate::api::AppState;
use crate::api::error_response::{TRENDING_MESSAGES, metadata_error};
use crate::types::TrendingEntry;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /api/trending - Fixed-size list of trending videos
#[utoipa::path(
    get,
    path = "/api/trending",
    tag = "metadata",
    responses(
        (status = 200, description = "Trending entries, at most the configured count", body = Vec<TrendingEntry>),
        (status = 500, description = "Extraction or parse failure", body = crate::error::ApiError),
        (status = 503, description = "Process limit reached", body = crate::error::ApiError)
    )
)]
pub async fn get_trending(State(state): State<AppState>) -> Response {
    let count = state.config.metadata.trending_count;
    match state.resolver.resolve_trending(count).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => metadata_error(e, &TRENDING_MESSAGES),
    }
}
