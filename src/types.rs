//! Core types for yt-relay

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Requested output of a download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OutputFormat {
    /// Audio only, transcoded to MP3
    #[serde(rename = "mp3")]
    Audio,
    /// Pre-merged audio+video MP4
    #[serde(rename = "mp4")]
    Video,
}

impl OutputFormat {
    /// File extension (also the `format` query value)
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Audio => "mp3",
            OutputFormat::Video => "mp4",
        }
    }

    /// MIME type sent as `Content-Type`
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Audio => "audio/mpeg",
            OutputFormat::Video => "video/mp4",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Audio),
            "mp4" => Ok(OutputFormat::Video),
            other => Err(Error::InvalidInput(format!(
                "unsupported format '{other}' (expected mp3 or mp4)"
            ))),
        }
    }
}

/// One validated download request
///
/// Built per HTTP request and dropped when the request completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Source video URL (already checked against the allowed hosts)
    pub source_url: String,
    /// Requested output
    pub output_format: OutputFormat,
}

impl ExtractionRequest {
    /// Create a new request
    pub fn new(source_url: impl Into<String>, output_format: OutputFormat) -> Self {
        Self {
            source_url: source_url.into(),
            output_format,
        }
    }
}

/// Normalized metadata of one video
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VideoMetadata {
    /// Video title
    pub title: String,
    /// Thumbnail URL (empty when the tool reported none)
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: String,
    /// Duration in whole seconds
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: u64,
}

/// One entry of the trending list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrendingEntry {
    /// Video title
    pub title: String,
    /// Watch URL
    pub url: String,
    /// Thumbnail URL (empty when the tool reported none)
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: String,
    /// Duration as `MM:SS`
    #[serde(rename = "durationFormatted")]
    pub duration_formatted: String,
}

/// Response body of `GET /api/info`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoInfoResponse {
    /// Video title
    pub title: String,
    /// Thumbnail URL
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: String,
    /// Duration in whole seconds
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: u64,
    /// Links into this service's download route
    #[serde(rename = "downloadLinks")]
    pub download_links: DownloadLinks,
    /// Audio download link (same as `downloadLinks.mp3`)
    pub link_mp3: String,
    /// Video download link (same as `downloadLinks.mp4`)
    pub link_mp4: String,
    /// Raw format list from the tool, when enabled in config
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub formats: Option<serde_json::Value>,
}

/// Download links for both output formats
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadLinks {
    /// Audio (MP3) link
    pub mp3: String,
    /// Video (MP4) link
    pub mp4: String,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("mp3".parse::<OutputFormat>().unwrap(), OutputFormat::Audio);
        assert_eq!("MP4".parse::<OutputFormat>().unwrap(), OutputFormat::Video);
        assert!(matches!(
            "webm".parse::<OutputFormat>(),
            Err(Error::InvalidInput(_))
        ));
        assert!("".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_headers_match_extension() {
        assert_eq!(OutputFormat::Audio.content_type(), "audio/mpeg");
        assert_eq!(OutputFormat::Video.content_type(), "video/mp4");
        assert_eq!(OutputFormat::Audio.to_string(), "mp3");
        assert_eq!(serde_json::to_value(OutputFormat::Video).unwrap(), "mp4");
    }

    #[test]
    fn metadata_serializes_with_wire_names() {
        let metadata = VideoMetadata {
            title: "Test".into(),
            thumbnail_url: "b".into(),
            duration_seconds: 125,
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["title"], "Test");
        assert_eq!(json["thumbnailURL"], "b");
        assert_eq!(json["durationSeconds"], 125);
    }

    #[test]
    fn trending_entry_serializes_with_wire_names() {
        let entry = TrendingEntry {
            title: "Song".into(),
            url: "https://www.youtube.com/watch?v=x".into(),
            thumbnail_url: String::new(),
            duration_formatted: "03:07".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["durationFormatted"], "03:07");
        assert_eq!(json["thumbnailURL"], "");
    }
}
