//! Error types for yt-relay
//!
//! This module provides the error taxonomy shared by the resolver, the stream
//! orchestrator and the HTTP surface:
//! - Domain error kinds (invalid input, extraction failure, malformed metadata, ...)
//! - HTTP status code mapping for API integration
//! - Structured JSON error bodies with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for yt-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for yt-relay
///
/// External-process failures are translated into these kinds at the
/// resolver/orchestrator boundary; raw I/O errors from spawning or reading a
/// child never reach the HTTP layer untranslated.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or disallowed URL, unsupported format, missing parameter
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "trending_count")
        key: Option<String>,
    },

    /// The extraction tool exited unsuccessfully before any output was delivered
    #[error("extraction failed: {diagnostic}")]
    ExtractionFailed {
        /// Captured standard error of the tool (tail, trimmed)
        diagnostic: String,
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
    },

    /// The tool succeeded but its JSON output could not be parsed
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// The executable could not be started (missing, not permitted, ...)
    #[error("failed to spawn {program}: {source}")]
    ProcessSpawnFailed {
        /// Program that was being started
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A stream that had already started delivering bytes was cut short
    ///
    /// No HTTP status can be sent at this point; this kind only appears in logs.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    /// The configured concurrent process limit is exhausted
    #[error("too many concurrent extraction processes")]
    TooManyProcesses,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error (bind failure, serve failure)
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Build an [`Error::ExtractionFailed`] from a diagnostic and exit code
    pub fn extraction_failed(diagnostic: impl Into<String>, exit_code: Option<i32>) -> Self {
        Error::ExtractionFailed {
            diagnostic: diagnostic.into(),
            exit_code,
        }
    }

    /// Diagnostic text suitable for the `details` field of an error body
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Error::ExtractionFailed { diagnostic, .. } => Some(diagnostic.clone()),
            Error::MalformedMetadata(msg) => Some(msg.clone()),
            Error::ProcessSpawnFailed { program, source } => {
                Some(format!("could not start {program}: {source}"))
            }
            Error::InvalidInput(msg) => Some(msg.clone()),
            Error::Config { message, .. } => Some(message.clone()),
            Error::StreamInterrupted(msg) => Some(msg.clone()),
            Error::Io(e) => Some(e.to_string()),
            Error::ApiServerError(msg) => Some(msg.clone()),
            Error::TooManyProcesses => None,
        }
    }
}

/// API error response format
///
/// This is the JSON body returned for failed `info` and `trending` requests:
///
/// ```json
/// {
///   "error": "Failed to fetch video details.",
///   "code": "extraction_failed",
///   "details": "ERROR: video unavailable",
///   "suggestion": "The server might be blocked by YouTube or the URL is invalid."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "invalid_input", "extraction_failed")
    pub code: String,

    /// Diagnostic text (usually the extraction tool's stderr)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Optional hint for the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ApiError {
    /// Create an API error for `error` under a caller-chosen public message
    pub fn from_error(error: &Error, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: error.error_code().to_string(),
            details: error.diagnostic(),
            suggestion: None,
        }
    }

    /// Attach a user-facing suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Trait for converting errors to HTTP status codes
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidInput(_) => 400,
            Error::Config { .. } => 400,

            // 500 Internal Server Error - extraction and server-side issues
            Error::ExtractionFailed { .. } => 500,
            Error::MalformedMetadata(_) => 500,
            Error::ProcessSpawnFailed { .. } => 500,
            Error::StreamInterrupted(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::TooManyProcesses => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::Config { .. } => "config_error",
            Error::ExtractionFailed { .. } => "extraction_failed",
            Error::MalformedMetadata(_) => "malformed_metadata",
            Error::ProcessSpawnFailed { .. } => "process_spawn_failed",
            Error::StreamInterrupted(_) => "stream_interrupted",
            Error::TooManyProcesses => "too_many_processes",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}
