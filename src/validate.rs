//! Input checks that run before anything reaches the backend.
//!
//! [`is_supported_url`] is the URL-shape predicate; [`validate_url`] wraps it
//! into a [`ValidationError`]. Rejected input never enters a session.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SUPPORTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(https?://)?(www\.)?(",
        r"youtube\.com/watch\?v=",
        r"|youtu\.be/",
        r"|youtube\.com/shorts/",
        r"|youtube\.com/embed/",
        r"|youtube\.com/v/",
        r"|youtube\.com/user/[^/]+/\w+/",
        r"|youtube\.com/[^/]+/\w+/",
        r"|youtube\.com/playlist\?list=",
        r"|youtube\.com/channel/",
        r"|youtube\.com/c/",
        r"|youtube\.com/user/",
        r").+",
    ))
    .expect("URL pattern is valid")
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:[^/\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})",
    )
    .expect("video id pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a video link")]
    Empty,

    #[error("'{0}' does not look like a supported video link")]
    UnsupportedUrl(String),
}

/// True only for URL shapes of the supported platform: watch, short links,
/// shorts, embed, `/v/`, playlist, channel, `/c/`, user and nested paths.
pub fn is_supported_url(url: &str) -> bool {
    SUPPORTED_URL.is_match(url)
}

/// Trim and check a user-supplied URL.
pub fn validate_url(input: &str) -> Result<String, ValidationError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !is_supported_url(url) {
        return Err(ValidationError::UnsupportedUrl(url.to_string()));
    }
    Ok(url.to_string())
}

/// The 11-character video id, when the URL carries one.
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_shapes() {
        let accepted = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtube.com/watch?v=dQw4w9WgXcQ&t=42",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/abc123",
            "https://www.youtube.com/shorts/abcdefghijk",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/playlist?list=PL123",
            "https://www.youtube.com/channel/UC123",
            "https://www.youtube.com/c/SomeChannel",
            "https://www.youtube.com/user/someone",
            "https://www.youtube.com/user/someone/videos/x",
            "https://www.youtube.com/attribution_link/u/xyz",
        ];
        for url in accepted {
            assert!(is_supported_url(url), "should accept {url}");
        }
    }

    #[test]
    fn rejects_other_inputs() {
        let rejected = [
            "",
            "hello",
            "https://vimeo.com/12345",
            "https://youtu.be/",
            "https://www.youtube.com/",
            "https://www.youtube.com/watch",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
        ];
        for url in rejected {
            assert!(!is_supported_url(url), "should reject {url}");
        }
    }

    #[test]
    fn validate_trims_and_reports() {
        assert_eq!(
            validate_url("  https://youtu.be/abc123 \n").unwrap(),
            "https://youtu.be/abc123"
        );
        assert_eq!(validate_url("   "), Err(ValidationError::Empty));
        assert!(matches!(
            validate_url("https://example.com"),
            Err(ValidationError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn extracts_video_ids() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=10"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_video_id("https://youtu.be/abc123"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/channel/UC123"), None);
    }
}
