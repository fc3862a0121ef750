//! Error types for inlinekit

use thiserror::Error;

/// Errors that can occur while fetching a single resource
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL scheme has no registered fetcher
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// A reference could not be resolved against its base URL
    #[error("Invalid URL \"{url}\"")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    Connect(#[source] reqwest::Error),

    /// Other request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned a non-2xx status
    #[error("Server returned status {0}")]
    HttpStatus(u16),

    /// Resource body exceeds the configured size limit
    #[error("Resource exceeds size limit of {limit} bytes")]
    TooLarge { limit: usize },

    /// Local file could not be read
    #[error("Failed to read file")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connect(err)
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Errors that abort an inlining run
///
/// Failures on individual sub-resources are not errors; they are recorded
/// in the [`InlineReport`](crate::InlineReport) and leave the original
/// reference untouched.
#[derive(Debug, Error)]
pub enum InlineError {
    /// Target is neither a supported URL nor an existing file
    #[error("Target is neither a URL nor an existing file: {0}")]
    UnsupportedTarget(String),

    /// The root document could not be fetched
    #[error("Failed to fetch root document from {url}")]
    RootFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The HTML rewriter rejected the document
    #[error("Failed to rewrite HTML: {0}")]
    Rewrite(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::UnsupportedScheme("ftp".to_string()).to_string(),
            "Unsupported URL scheme: ftp"
        );
        assert_eq!(
            FetchError::HttpStatus(404).to_string(),
            "Server returned status 404"
        );
        assert_eq!(
            FetchError::TooLarge { limit: 1024 }.to_string(),
            "Resource exceeds size limit of 1024 bytes"
        );
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
    }

    #[test]
    fn test_root_fetch_carries_source() {
        let err = InlineError::RootFetch {
            url: "https://example.com/".to_string(),
            source: FetchError::HttpStatus(500),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch root document from https://example.com/"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
