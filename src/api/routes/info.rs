//! Video details handler.

use super::InfoQuery;
use crate::api::AppState;
use crate::api::error_response::{INFO_MESSAGES, metadata_error};
use crate::error::Result;
use crate::types::{DownloadLinks, OutputFormat, VideoInfoResponse};
use crate::utils::{build_download_link, validate_source_url};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /api/info - Video details plus download links
#[utoipa::path(
    get,
    path = "/api/info",
    tag = "metadata",
    params(InfoQuery),
    responses(
        (status = 200, description = "Video details", body = VideoInfoResponse),
        (status = 400, description = "Missing or unsupported URL", body = crate::error::ApiError),
        (status = 500, description = "Extraction or parse failure", body = crate::error::ApiError),
        (status = 503, description = "Process limit reached", body = crate::error::ApiError)
    )
)]
pub async fn get_info(State(state): State<AppState>, Query(query): Query<InfoQuery>) -> Response {
    match video_info(&state, query.url.as_deref().unwrap_or_default()).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => metadata_error(e, &INFO_MESSAGES),
    }
}

async fn video_info(state: &AppState, raw_url: &str) -> Result<VideoInfoResponse> {
    let url = validate_source_url(raw_url, &state.config.metadata.allowed_hosts)?;
    let resolved = state.resolver.resolve_info_detailed(url.as_str()).await?;
    let metadata = resolved.metadata;

    let base = state.config.server.api.base_url();
    let mp3 = build_download_link(
        &base,
        url.as_str(),
        OutputFormat::Audio,
        Some(metadata.title.as_str()),
    )?;
    let mp4 = build_download_link(
        &base,
        url.as_str(),
        OutputFormat::Video,
        Some(metadata.title.as_str()),
    )?;

    Ok(VideoInfoResponse {
        title: metadata.title,
        thumbnail_url: metadata.thumbnail_url,
        duration_seconds: metadata.duration_seconds,
        link_mp3: mp3.clone(),
        link_mp4: mp4.clone(),
        download_links: DownloadLinks { mp3, mp4 },
        formats: resolved
            .formats
            .filter(|_| state.config.metadata.include_formats),
    })
}
