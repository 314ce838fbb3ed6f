//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - `info` - Single video details and download links
//! - `trending` - Fixed-size trending list
//! - `download` - Streamed downloads
//! - `system` - Health, OpenAPI

use serde::{Deserialize, Serialize};

mod download;
mod info;
mod system;
mod trending;

pub use download::*;
pub use info::*;
pub use system::*;
pub use trending::*;

// ============================================================================
// Query/Response Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /api/info
///
/// Fields are optional so a missing value reaches validation and gets the
/// same 400 body as a bad one.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InfoQuery {
    /// Source video URL
    pub url: Option<String>,
}

/// Query parameters for GET /api/download
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Source video URL
    pub url: Option<String>,
    /// `mp3` or `mp4`
    pub format: Option<String>,
    /// Title used for the attachment filename
    pub title: Option<String>,
}

/// Response for GET /api/health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version
    pub version: String,
    /// Resolved extraction tool path
    pub extractor: String,
}
