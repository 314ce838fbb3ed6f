//! Configuration types for yt-relay
//!
//! The whole service runs off one immutable [`Config`], built once at startup
//! and shared as `Arc<Config>` by the resolver, the orchestrator and the API.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// External tool locations and invocation flags
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable handed to yt-dlp (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Netscape cookie file passed with `--cookies`
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Flags prepended to every yt-dlp invocation
    #[serde(default)]
    pub global_args: Vec<String>,

    /// Environment overrides applied to every spawned process
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            cookies_file: None,
            global_args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

/// Streaming download behavior
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Number of stdout chunks buffered between the process and the response (default: 16)
    ///
    /// A full channel stops the pump from reading, which in turn lets the
    /// process block on its pipe: the client's read speed drives the tool.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Bytes of stderr kept as diagnostic text, newest last (default: 64 KiB)
    #[serde(default = "default_stderr_limit")]
    pub stderr_limit_bytes: usize,

    /// Maximum stdout buffered for a metadata lookup (default: 32 MiB)
    #[serde(default = "default_max_metadata_bytes")]
    pub max_metadata_bytes: usize,

    /// Abort a stream when stdout is silent for this long (None = wait forever)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub stall_timeout: Option<Duration>,

    /// Upper bound on simultaneously running tool processes (None = unbounded)
    #[serde(default)]
    pub max_concurrent_processes: Option<usize>,

    /// Ask the tool for the title when a download request carries none (default: true)
    #[serde(default = "default_true")]
    pub resolve_missing_title: bool,

    /// Filename used when the title sanitizes to nothing (default: "video_download")
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            stderr_limit_bytes: default_stderr_limit(),
            max_metadata_bytes: default_max_metadata_bytes(),
            stall_timeout: None,
            max_concurrent_processes: None,
            resolve_missing_title: true,
            default_filename: default_filename(),
        }
    }
}

/// Metadata lookup and URL acceptance
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MetadataConfig {
    /// Accepted hosts; subdomains match too (default: youtube.com, youtu.be)
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Pass the tool's `formats` array through in `info` responses (default: false)
    #[serde(default)]
    pub include_formats: bool,

    /// Number of trending entries requested (default: 10)
    #[serde(default = "default_trending_count")]
    pub trending_count: usize,

    /// Search terms used for the trending list (default: "trending")
    #[serde(default = "default_trending_query")]
    pub trending_query: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            include_formats: false,
            trending_count: default_trending_count(),
            trending_query: default_trending_query(),
        }
    }
}

/// Server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:4000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Absolute base URL used in generated download links (default: http://<bind_address>)
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_base_url: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

impl ApiConfig {
    /// Base URL for links pointing back into this service, without trailing slash
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_address),
        }
    }
}

/// Main configuration for yt-relay
///
/// Fields are organized into logical sub-configs:
/// - [`tools`](ToolsConfig) - yt-dlp / ffmpeg locations and flags
/// - [`download`](DownloadConfig) - streaming behavior and limits
/// - [`metadata`](MetadataConfig) - URL acceptance, trending list
/// - [`server`](ServerIntegrationConfig) - HTTP API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// External tool paths and flags
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Streaming download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Metadata lookup behavior
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// API server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a configuration from a JSON file; absent keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail at request time
    pub fn validate(&self) -> Result<()> {
        if self.download.channel_capacity == 0 {
            return Err(config_error("must be at least 1", "channel_capacity"));
        }
        if self.download.max_concurrent_processes == Some(0) {
            return Err(config_error(
                "must be at least 1 when set",
                "max_concurrent_processes",
            ));
        }
        if self.download.default_filename.trim().is_empty() {
            return Err(config_error("must not be empty", "default_filename"));
        }
        if self.metadata.trending_count == 0 {
            return Err(config_error("must be at least 1", "trending_count"));
        }
        if self.metadata.allowed_hosts.is_empty() {
            return Err(config_error("must list at least one host", "allowed_hosts"));
        }
        if let Some(base) = &self.server.api.public_base_url {
            url::Url::parse(base)
                .map_err(|e| config_error(&format!("invalid URL: {e}"), "public_base_url"))?;
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

fn default_true() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    16
}

fn default_stderr_limit() -> usize {
    64 * 1024
}

fn default_max_metadata_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_filename() -> String {
    "video_download".to_string()
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["youtube.com".into(), "youtu.be".into()]
}

fn default_trending_count() -> usize {
    10
}

fn default_trending_query() -> String {
    "trending".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
