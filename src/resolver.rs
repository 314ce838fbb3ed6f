//! Metadata resolver
//!
//! Runs yt-dlp in one of its JSON-dumping modes, buffers the (small) output
//! completely and normalizes it. Metadata output is bounded by
//! `download.max_metadata_bytes`; media bytes never pass through here.

use crate::error::{Error, Result};
use crate::extractor::{Extractor, Invocation};
use crate::process::ProcessExit;
use crate::types::{TrendingEntry, VideoMetadata};
use crate::utils::format_duration;
use serde::Deserialize;

/// Subset of yt-dlp's per-video JSON that yt-relay reads
#[derive(Debug, Deserialize)]
struct RawVideo {
    title: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Option<Vec<RawThumbnail>>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    #[serde(default)]
    url: Option<String>,
}

/// Subset of a flat-playlist entry
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Option<Vec<RawThumbnail>>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Video metadata plus the optional raw format list
#[derive(Debug, Clone)]
pub struct ResolvedInfo {
    /// Normalized metadata
    pub metadata: VideoMetadata,
    /// yt-dlp's `formats` array, untouched
    pub formats: Option<serde_json::Value>,
}

/// Resolves video metadata and search listings through yt-dlp
#[derive(Clone, Debug)]
pub struct MetadataResolver {
    extractor: Extractor,
}

impl MetadataResolver {
    /// Create a resolver on top of `extractor`
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    /// Fetch and normalize metadata for one video
    ///
    /// The caller must have validated `url` against the allowed hosts.
    pub async fn resolve_info(&self, url: &str) -> Result<VideoMetadata> {
        Ok(self.resolve_info_detailed(url).await?.metadata)
    }

    /// Like [`resolve_info`](Self::resolve_info) but also keeps the format list
    pub async fn resolve_info_detailed(&self, url: &str) -> Result<ResolvedInfo> {
        tracing::debug!(url, "resolving video info");
        let stdout = self.run(&Invocation::DumpInfo { url }).await?;
        let info = parse_video_info(&stdout)?;
        tracing::info!(url, title = %info.metadata.title, "resolved video info");
        Ok(info)
    }

    /// Fetch up to `count` entries of the configured trending search
    ///
    /// All lines must parse; one bad line fails the whole call.
    pub async fn resolve_trending(&self, count: usize) -> Result<Vec<TrendingEntry>> {
        let query = format!(
            "ytsearch{}:{}",
            count,
            self.extractor.config().metadata.trending_query
        );
        tracing::debug!(%query, "resolving trending list");

        let stdout = self.run(&Invocation::Search { query: &query }).await?;
        let entries = parse_trending(&stdout, count)?;

        tracing::info!(count = entries.len(), "resolved trending list");
        Ok(entries)
    }

    /// Ask the tool for a video's title
    pub async fn resolve_title(&self, url: &str) -> Result<String> {
        let stdout = self.run(&Invocation::Title { url }).await?;
        String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedMetadata("tool printed no title".to_string()))
    }

    async fn run(&self, invocation: &Invocation<'_>) -> Result<Vec<u8>> {
        let handle = self.extractor.spawn(invocation)?;
        let pid = handle.pid();
        let limit = self.extractor.config().download.max_metadata_bytes;

        let (stdout, exit) = handle.collect_output(limit).await?;
        check_exit(&exit, pid)?;
        Ok(stdout)
    }
}

fn check_exit(exit: &ProcessExit, pid: Option<u32>) -> Result<()> {
    if exit.success() {
        return Ok(());
    }
    tracing::error!(
        pid = ?pid,
        exit_code = ?exit.code,
        diagnostic = %exit.diagnostic,
        "extraction tool failed"
    );
    Err(exit.clone().into_error())
}

/// Parse one `-j` document
pub fn parse_video_info(stdout: &[u8]) -> Result<ResolvedInfo> {
    let raw: RawVideo = serde_json::from_slice(stdout)
        .map_err(|e| Error::MalformedMetadata(format!("invalid video JSON: {e}")))?;

    Ok(ResolvedInfo {
        metadata: VideoMetadata {
            title: raw.title,
            thumbnail_url: pick_thumbnail(raw.thumbnail, raw.thumbnails),
            duration_seconds: whole_seconds(raw.duration),
        },
        formats: raw.formats,
    })
}

/// Parse newline-delimited `--dump-json --flat-playlist` output
///
/// Blank lines are skipped; at most `count` entries are returned.
pub fn parse_trending(stdout: &[u8], count: usize) -> Result<Vec<TrendingEntry>> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| Error::MalformedMetadata(format!("search output is not UTF-8: {e}")))?;

    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: RawEntry = serde_json::from_str(line).map_err(|e| {
            Error::MalformedMetadata(format!("invalid JSON on line {}: {e}", index + 1))
        })?;

        entries.push(TrendingEntry {
            url: entry_url(&raw),
            title: raw.title.unwrap_or_default(),
            thumbnail_url: pick_thumbnail(raw.thumbnail, raw.thumbnails),
            duration_formatted: format_duration(whole_seconds(raw.duration)),
        });
    }

    entries.truncate(count);
    Ok(entries)
}

/// A single thumbnail field wins; otherwise the last candidate, which yt-dlp
/// lists in ascending resolution.
fn pick_thumbnail(single: Option<String>, candidates: Option<Vec<RawThumbnail>>) -> String {
    if let Some(url) = single.filter(|u| !u.is_empty()) {
        return url;
    }
    candidates
        .unwrap_or_default()
        .into_iter()
        .rev()
        .find_map(|t| t.url.filter(|u| !u.is_empty()))
        .unwrap_or_default()
}

fn whole_seconds(duration: Option<f64>) -> u64 {
    duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d as u64)
        .unwrap_or(0)
}

fn entry_url(raw: &RawEntry) -> String {
    [raw.url.as_ref(), raw.webpage_url.as_ref()]
        .into_iter()
        .flatten()
        .find(|u| u.starts_with("http"))
        .cloned()
        .or_else(|| {
            raw.id
                .as_ref()
                .map(|id| format!("https://www.youtube.com/watch?v={id}"))
        })
        .unwrap_or_default()
}
