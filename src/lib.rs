//! # yt-relay
//!
//! HTTP relay in front of yt-dlp: looks up YouTube video metadata and streams
//! MP3 or MP4 downloads straight from the tool's stdout to the client.
//!
//! ## Design
//!
//! - **No disk** - media bytes go from the tool's stdout to the response body
//!   through a small bounded buffer, so the client's read speed drives the tool
//! - **One process per request** - every extraction owns its own process and
//!   nothing else; a client that goes away gets its process killed
//! - **Tools from the outside** - yt-dlp and ffmpeg are found on PATH or
//!   configured explicitly, and always invoked without a shell
//!
//! ## Quick Start
//!
//! ```no_run
//! use yt_relay::{Config, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     // Serve until SIGTERM / Ctrl+C
//!     run_with_shutdown(Arc::new(config)).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// yt-dlp invocation
pub mod extractor;
/// External process adapter
pub mod process;
/// Metadata resolver
pub mod resolver;
/// Stream download orchestrator
pub mod streaming;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use extractor::Extractor;
pub use resolver::MetadataResolver;
pub use streaming::{StreamOrchestrator, StreamOutcome, StreamState};
pub use types::{ExtractionRequest, OutputFormat, TrendingEntry, VideoMetadata};

use std::sync::Arc;

/// Run the API server until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// After the signal the server stops accepting connections and waits for
/// in-flight requests to finish.
pub async fn run_with_shutdown(config: Arc<Config>) -> Result<()> {
    api::serve_until(config, wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
