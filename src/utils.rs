//! Utility functions for URL checks, filenames and formatting

use crate::error::{Error, Result};
use crate::types::OutputFormat;
use url::Url;

/// Validate a user-supplied source URL
///
/// The URL must parse, use http or https, and have a host equal to (or a
/// subdomain of) one of `allowed_hosts`. Nothing is spawned for a URL that
/// fails this check.
///
/// # Examples
///
/// ```
/// use yt_relay::utils::validate_source_url;
///
/// let hosts = vec!["youtube.com".to_string(), "youtu.be".to_string()];
/// assert!(validate_source_url("https://www.youtube.com/watch?v=abc123", &hosts).is_ok());
/// assert!(validate_source_url("https://youtu.be/abc123", &hosts).is_ok());
/// assert!(validate_source_url("https://example.com/?q=youtube.com", &hosts).is_err());
/// ```
pub fn validate_source_url(raw: &str, allowed_hosts: &[String]) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidInput("missing url".to_string()));
    }

    let url = Url::parse(raw).map_err(|e| Error::InvalidInput(format!("malformed url: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidInput(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidInput("url has no host".to_string()))?
        .to_ascii_lowercase();

    let allowed = allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.trim().to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    });

    if allowed {
        Ok(url)
    } else {
        Err(Error::InvalidInput(format!("host '{host}' is not supported")))
    }
}

/// Reduce a title to letters, digits and spaces
///
/// Every other character is dropped; whitespace of any kind becomes a plain
/// space so the result is always safe inside a quoted header parameter. The
/// result is trimmed, and `default` is returned if nothing survives.
///
/// # Examples
///
/// ```
/// use yt_relay::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Video: Part #1!", "video_download"), "My Video Part 1");
/// assert_eq!(sanitize_filename("!!!", "video_download"), "video_download");
/// ```
pub fn sanitize_filename(title: &str, default: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build the `Content-Disposition` value for an attachment
///
/// `base` must already be sanitized. Non-ASCII titles get an ASCII
/// `filename` fallback plus an RFC 5987 `filename*` parameter.
pub fn content_disposition(base: &str, format: OutputFormat, default: &str) -> String {
    let ext = format.extension();

    if base.is_ascii() {
        return format!("attachment; filename=\"{base}.{ext}\"");
    }

    let ascii: String = base.chars().filter(char::is_ascii).collect();
    let ascii = ascii.split_whitespace().collect::<Vec<_>>().join(" ");
    let ascii = if ascii.is_empty() { default } else { ascii.as_str() };

    format!(
        "attachment; filename=\"{ascii}.{ext}\"; filename*=UTF-8''{}",
        urlencoding::encode(&format!("{base}.{ext}"))
    )
}

/// Format a duration as `MM:SS` with zero-padded seconds
///
/// Minutes are zero-padded to two digits and keep growing past 59.
///
/// # Examples
///
/// ```
/// use yt_relay::utils::format_duration;
///
/// assert_eq!(format_duration(125), "02:05");
/// assert_eq!(format_duration(3725), "62:05");
/// ```
pub fn format_duration(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Build an absolute link into this service's download route
///
/// `title` is carried verbatim; it is sanitized only when the link is redeemed.
pub fn build_download_link(
    base_url: &str,
    source_url: &str,
    format: OutputFormat,
    title: Option<&str>,
) -> Result<String> {
    let mut link = Url::parse(&format!("{}/api/download", base_url.trim_end_matches('/')))
        .map_err(|e| Error::Config {
            message: format!("invalid public base url '{base_url}': {e}"),
            key: Some("public_base_url".to_string()),
        })?;

    {
        let mut query = link.query_pairs_mut();
        query.append_pair("url", source_url);
        query.append_pair("format", format.extension());
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            query.append_pair("title", title);
        }
    }

    Ok(link.into())
}
