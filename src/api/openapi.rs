//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the yt-relay REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the yt-relay REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "yt-relay REST API",
        version = "0.1.0",
        description = "Looks up YouTube video metadata and relays audio or video downloads straight from yt-dlp to the client",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server")
    ),
    paths(
        // Metadata
        crate::api::routes::get_info,
        crate::api::routes::get_trending,

        // Downloads
        crate::api::routes::download,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::OutputFormat,
        crate::types::VideoInfoResponse,
        crate::types::DownloadLinks,
        crate::types::TrendingEntry,
        crate::api::routes::HealthResponse,
        crate::error::ApiError,
    )),
    tags(
        (name = "metadata", description = "Video details and the trending list"),
        (name = "downloads", description = "Streamed MP3 / MP4 downloads"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
