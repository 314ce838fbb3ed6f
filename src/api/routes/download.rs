//! Streamed download handler.

use super::DownloadQuery;
use crate::api::AppState;
use crate::api::error_response::download_error;
use crate::error::Result;
use crate::streaming::PreparedDownload;
use crate::types::{ExtractionRequest, OutputFormat};
use crate::utils::validate_source_url;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// GET /api/download - Stream MP3 or MP4 bytes as an attachment
///
/// Nothing is written to disk: the response body is the tool's stdout.
#[utoipa::path(
    get,
    path = "/api/download",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Media stream (audio/mpeg or video/mp4)", content_type = "application/octet-stream"),
        (status = 400, description = "Missing or unsupported URL or format", content_type = "text/plain"),
        (status = 500, description = "Extraction failed before streaming began", content_type = "text/plain"),
        (status = 503, description = "Process limit reached", content_type = "text/plain")
    )
)]
pub async fn download(State(state): State<AppState>, Query(query): Query<DownloadQuery>) -> Response {
    let request = match parse_request(&state, &query) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejected download request");
            return download_error(e);
        }
    };

    let title = resolve_title(&state, &request, query.title).await;

    match state.orchestrator.start(&request, title.as_deref()).await {
        Ok(prepared) => prepared.into_response(),
        Err(e) => download_error(e),
    }
}

fn parse_request(state: &AppState, query: &DownloadQuery) -> Result<ExtractionRequest> {
    let url = validate_source_url(
        query.url.as_deref().unwrap_or_default(),
        &state.config.metadata.allowed_hosts,
    )?;
    let format: OutputFormat = query.format.as_deref().unwrap_or_default().parse()?;
    Ok(ExtractionRequest::new(url, format))
}

/// Title from the query, or from the tool when enabled
///
/// A failed lookup is not fatal; the default filename is used instead.
async fn resolve_title(
    state: &AppState,
    request: &ExtractionRequest,
    title: Option<String>,
) -> Option<String> {
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        return Some(title);
    }
    if !state.config.download.resolve_missing_title {
        return None;
    }

    match state.resolver.resolve_title(&request.source_url).await {
        Ok(title) => Some(title),
        Err(e) => {
            tracing::warn!(url = %request.source_url, error = %e, "title lookup failed, using default filename");
            None
        }
    }
}

impl IntoResponse for PreparedDownload {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        let disposition = self.content_disposition().to_string();
        let active = self.spawn();

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            Body::from_stream(active.body),
        )
            .into_response()
    }
}
