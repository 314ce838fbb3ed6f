//! HTTP error response handling for the API
//!
//! Metadata endpoints answer with a JSON [`ApiError`]; the download endpoint
//! answers with plain text, since clients usually open it as a file link.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Public messages of one metadata endpoint
#[derive(Debug, Clone, Copy)]
pub struct FailureMessages {
    /// The tool failed or could not be started
    pub fetch: &'static str,
    /// The tool succeeded but printed something unusable
    pub parse: &'static str,
    /// Hint attached to fetch failures
    pub suggestion: Option<&'static str>,
}

/// Messages for `GET /api/info`
pub const INFO_MESSAGES: FailureMessages = FailureMessages {
    fetch: "Failed to fetch video details.",
    parse: "Failed to parse video details.",
    suggestion: Some("The server might be blocked by YouTube or the URL is invalid."),
};

/// Messages for `GET /api/trending`
pub const TRENDING_MESSAGES: FailureMessages = FailureMessages {
    fetch: "Failed to fetch trending videos.",
    parse: "Failed to parse trending videos.",
    suggestion: None,
};

const BUSY_MESSAGE: &str = "Too many extractions in progress, try again later.";

/// JSON error response for a metadata endpoint
pub fn metadata_error(error: Error, messages: &FailureMessages) -> Response {
    let api_error = match &error {
        Error::InvalidInput(_) => ApiError::from_error(&error, "Invalid YouTube URL"),
        Error::MalformedMetadata(_) => ApiError::from_error(&error, messages.parse),
        Error::TooManyProcesses => ApiError::from_error(&error, BUSY_MESSAGE),
        _ => {
            let api_error = ApiError::from_error(&error, messages.fetch);
            match messages.suggestion {
                Some(hint) => api_error.with_suggestion(hint),
                None => api_error,
            }
        }
    };

    (status_of(&error), Json(api_error)).into_response()
}

/// Plain-text error response for the download endpoint
pub fn download_error(error: Error) -> Response {
    let body = match &error {
        Error::InvalidInput(msg) if msg.starts_with("unsupported format") => format!(
            "Unsupported format: {}",
            msg.trim_start_matches("unsupported format").trim()
        ),
        Error::InvalidInput(msg) => format!("Invalid YouTube URL: {msg}"),
        Error::TooManyProcesses => BUSY_MESSAGE.to_string(),
        other => format!(
            "Download failed: {}",
            other.diagnostic().unwrap_or_else(|| other.to_string())
        ),
    };

    (
        status_of(&error),
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn status_of(error: &Error) -> StatusCode {
    StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
