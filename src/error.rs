//! Error types and classification
//!
//! Every fallible stage of a posting cycle has its own error enum, and each
//! enum classifies its variants as transient (worth retrying) or permanent.
//! The unified [`Error`] wraps them for surfaces that cross stage boundaries.

use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Transience classification shared by the stage error enums
///
/// Transient errors are retried with backoff; permanent errors are
/// surfaced immediately without consuming retry attempts.
pub trait ErrorClass {
    fn is_transient(&self) -> bool;

    /// Short category label for logging
    fn category(&self) -> &'static str;
}

// ============================================================================
// Provider errors
// ============================================================================

/// Failures from a wallpaper provider query
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Invalid or rejected API key
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// Provider signalled rate limiting (HTTP 429 or equivalent)
    #[error("provider rate limit exceeded")]
    RateLimit,

    /// Connection, DNS or timeout failure
    #[error("provider network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider returned an unexpected HTTP status; only 5xx is retried
    #[error("provider returned HTTP {0}")]
    Server(u16),

    /// The query succeeded but returned no usable results
    #[error("provider returned no results")]
    EmptyResult,

    /// The response body did not match the expected shape
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ErrorClass for ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            Self::RateLimit | Self::Network(_) => true,
            // 4xx means the request itself is wrong; retrying cannot help
            Self::Server(code) => *code >= 500,
            Self::Auth(_) | Self::EmptyResult | Self::Decode(_) => false,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::RateLimit => "rate_limit",
            Self::Network(_) => "network",
            Self::Server(_) => "server",
            Self::EmptyResult => "empty_result",
            Self::Decode(_) => "decode",
        }
    }
}

// ============================================================================
// Download errors
// ============================================================================

/// Failures while downloading image bytes
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Connection, DNS or timeout failure
    #[error("download network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the image host
    #[error("download failed: HTTP {0}")]
    Status(u16),

    /// Response body was not an image
    #[error("unexpected content type: {0}")]
    InvalidContentType(String),

    /// Response body was empty
    #[error("downloaded image is empty")]
    Empty,
}

impl ErrorClass for DownloadError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::InvalidContentType(_) | Self::Empty => false,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Status(_) => "status",
            Self::InvalidContentType(_) => "content_type",
            Self::Empty => "empty",
        }
    }
}

// ============================================================================
// Send errors
// ============================================================================

/// Failures while posting to the messaging channel
#[derive(Error, Debug)]
pub enum SendError {
    /// Bot token rejected
    #[error("messaging authentication failed: {0}")]
    Auth(String),

    /// Connection failure or flood-wait; retried with backoff
    #[error("messaging network error: {0}")]
    Network(String),

    /// The API rejected the message (bad chat id, oversized photo, ...)
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl ErrorClass for SendError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Network(_) => "network",
            Self::Rejected(_) => "rejected",
        }
    }
}

// ============================================================================
// Unified error
// ============================================================================

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Send(#[from] SendError),

    /// State file could not be read or written; logged, never fatal
    /// mid-cycle
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

impl ErrorClass for Error {
    fn is_transient(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_transient(),
            Self::Download(e) => e.is_transient(),
            Self::Send(e) => e.is_transient(),
            Self::Config(_) | Self::Persistence(_) | Self::Io(_) | Self::Json(_) => false,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Provider(e) => e.category(),
            Self::Download(e) => e.category(),
            Self::Send(e) => e.category(),
            Self::Persistence(_) => "persistence",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_transience() {
        assert!(ProviderError::RateLimit.is_transient());
        assert!(ProviderError::Server(500).is_transient());
        assert!(ProviderError::Server(502).is_transient());
        assert!(!ProviderError::Auth("bad key".into()).is_transient());
        assert!(!ProviderError::EmptyResult.is_transient());
        assert!(!ProviderError::Decode("missing field".into()).is_transient());
    }

    #[test]
    fn test_provider_4xx_statuses_are_permanent() {
        // a wrong request must fail fast, not burn the retry budget
        for code in [400, 404, 410, 422] {
            assert!(
                !ProviderError::Server(code).is_transient(),
                "HTTP {code} must be permanent"
            );
        }
    }

    #[test]
    fn test_download_transience() {
        assert!(DownloadError::Status(503).is_transient());
        assert!(DownloadError::Status(429).is_transient());
        assert!(!DownloadError::Status(404).is_transient());
        assert!(!DownloadError::InvalidContentType("text/html".into()).is_transient());
        assert!(!DownloadError::Empty.is_transient());
    }

    #[test]
    fn test_send_transience() {
        assert!(SendError::Network("timed out".into()).is_transient());
        assert!(!SendError::Auth("401".into()).is_transient());
        assert!(!SendError::Rejected("photo too large".into()).is_transient());
    }

    #[test]
    fn test_unified_delegates_classification() {
        let e: Error = ProviderError::RateLimit.into();
        assert!(e.is_transient());
        assert_eq!(e.category(), "rate_limit");

        let e = Error::config("missing BOT_TOKEN");
        assert!(!e.is_transient());
        assert_eq!(e.category(), "config");
    }

    #[test]
    fn test_display_messages() {
        let e = ProviderError::Server(500);
        assert!(e.to_string().contains("500"));

        let e = Error::persistence("stats.json unwritable");
        assert!(e.to_string().contains("stats.json"));
    }
}
