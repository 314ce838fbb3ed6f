//! yt-relay server binary
//!
//! Usage: `yt-relay [CONFIG.json]`. Without a path the built-in defaults are
//! used. Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use yt_relay::{Config, run_with_shutdown};

const DEFAULT_LOG_FILTER: &str = "yt_relay=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = match load_config(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run_with_shutdown(Arc::new(config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> yt_relay::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            Config::from_json_file(&path)
        }
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
