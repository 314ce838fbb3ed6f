//! yt-dlp invocation: tool discovery, argument sets and spawning
//!
//! Every argument list is built here so the resolver and the orchestrator
//! never assemble flags themselves. The source URL always comes last, after a
//! `--` separator, so it can never be read as an option.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{self, ProcessHandle, SpawnOptions};
use crate::types::OutputFormat;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Name searched on PATH when no extraction tool path is configured
pub const YT_DLP: &str = "yt-dlp";

/// Name searched on PATH when no transcoding engine path is configured
pub const FFMPEG: &str = "ffmpeg";

/// Destination understood by yt-dlp as "write media to stdout"
pub const STDOUT_SENTINEL: &str = "-";

/// Format selector for the audio path (audio-only streams)
pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio";

/// Format selector for the video path (single pre-merged file, no server-side merge)
pub const VIDEO_FORMAT_SELECTOR: &str = "best[ext=mp4]/best";

/// Invocation mode of the extraction tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation<'a> {
    /// One JSON document describing a single video
    DumpInfo {
        /// Source URL
        url: &'a str,
    },
    /// Title only, one line
    Title {
        /// Source URL
        url: &'a str,
    },
    /// Newline-delimited JSON for a search, without resolving each entry
    Search {
        /// Search expression, e.g. `ytsearch10:trending`
        query: &'a str,
    },
    /// Media bytes on stdout
    Download {
        /// Source URL
        url: &'a str,
        /// Requested output
        format: OutputFormat,
    },
}

/// Launches yt-dlp with the configured tools and flags
///
/// Cheap to clone; all clones share the admission limit.
#[derive(Clone, Debug)]
pub struct Extractor {
    config: Arc<Config>,
    program: PathBuf,
    ffmpeg: PathBuf,
    limiter: Option<Arc<Semaphore>>,
}

impl Extractor {
    /// Resolve tool locations from `config`
    ///
    /// Explicit paths win; otherwise PATH is searched (when enabled) and the
    /// bare program name is used as a last resort, leaving the OS to report a
    /// missing binary at spawn time.
    pub fn new(config: Arc<Config>) -> Self {
        let tools = &config.tools;
        let program = locate(tools.ytdlp_path.as_deref(), YT_DLP, tools.search_path);
        let ffmpeg = locate(tools.ffmpeg_path.as_deref(), FFMPEG, tools.search_path);
        let limiter = config
            .download
            .max_concurrent_processes
            .map(|limit| Arc::new(Semaphore::new(limit)));

        tracing::info!(
            ytdlp = %program.display(),
            ffmpeg = %ffmpeg.display(),
            max_processes = ?config.download.max_concurrent_processes,
            "extraction tool configured"
        );

        Self {
            config,
            program,
            ffmpeg,
            limiter,
        }
    }

    /// Shared configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Resolved extraction tool path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Resolved transcoding engine path
    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Full argument list for `invocation`
    pub fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        let tools = &self.config.tools;
        let mut args: Vec<OsString> = tools.global_args.iter().map(OsString::from).collect();

        if let Some(cookies) = &tools.cookies_file {
            args.push("--cookies".into());
            args.push(cookies.into());
        }

        let target = match invocation {
            Invocation::DumpInfo { url } => {
                args.extend(["--no-playlist", "-j"].map(OsString::from));
                *url
            }
            Invocation::Title { url } => {
                args.extend(["--no-playlist", "--get-title"].map(OsString::from));
                *url
            }
            Invocation::Search { query } => {
                args.extend(["--dump-json", "--flat-playlist"].map(OsString::from));
                *query
            }
            Invocation::Download { url, format } => {
                args.extend(["--no-playlist", "--no-progress"].map(OsString::from));
                args.push("--ffmpeg-location".into());
                args.push(self.ffmpeg.clone().into());
                match format {
                    OutputFormat::Audio => {
                        args.extend(
                            [
                                "-f",
                                AUDIO_FORMAT_SELECTOR,
                                "-x",
                                "--audio-format",
                                "mp3",
                                "--audio-quality",
                                "0",
                            ]
                            .map(OsString::from),
                        );
                    }
                    OutputFormat::Video => {
                        args.extend(["-f", VIDEO_FORMAT_SELECTOR].map(OsString::from));
                    }
                }
                args.push("-o".into());
                args.push(STDOUT_SENTINEL.into());
                *url
            }
        };

        args.push("--".into());
        args.push(target.into());
        args
    }

    /// Start the tool for `invocation`
    ///
    /// Fails with [`Error::TooManyProcesses`] without spawning when the
    /// configured process limit is exhausted.
    pub fn spawn(&self, invocation: &Invocation<'_>) -> Result<ProcessHandle> {
        let permit = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .clone()
                    .try_acquire_owned()
                    .map_err(|_| Error::TooManyProcesses)?,
            ),
            None => None,
        };

        let options = SpawnOptions {
            env: self
                .config
                .tools
                .env
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            stderr_limit: self.config.download.stderr_limit_bytes,
        };

        process::spawn(&self.program, &self.args(invocation), &options, permit)
    }
}

fn locate(explicit: Option<&Path>, name: &str, search_path: bool) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if search_path {
        if let Ok(found) = which::which(name) {
            return found;
        }
        tracing::warn!(program = name, "not found in PATH, relying on bare name");
    }
    PathBuf::from(name)
}
