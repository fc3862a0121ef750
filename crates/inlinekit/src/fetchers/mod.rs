//! Fetcher system for resource retrieval
//!
//! Design: each fetcher handles one URL scheme. FetcherRegistry dispatches
//! to the first matching fetcher.

mod file;
mod http;

pub use file::FileFetcher;
pub use http::HttpFetcher;

use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use url::Url;

/// A fetched resource: raw bytes plus the media type reported by the transport
///
/// The media type, when present, comes from the Content-Type header (HTTP)
/// or the file extension (local files). Callers fall back to content
/// sniffing when it is absent.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// Raw resource bytes
    pub bytes: Bytes,
    /// Media type as reported by the transport, if any
    pub media_type: Option<String>,
}

/// Per-fetch configuration threaded through the registry
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User-Agent sent with HTTP requests
    pub user_agent: String,
    /// Bounded timeout covering the whole fetch; timeout is a fetch failure
    pub timeout: Duration,
    /// Maximum body size accepted, enforced while streaming
    pub max_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            max_size: 10 * 1024 * 1024,
        }
    }
}

/// Trait for scheme-specific resource fetchers
///
/// Implement this trait to support additional URL schemes. Each fetcher
/// declares what URLs it can handle via `matches()` and performs the
/// actual retrieval via `fetch()`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Returns true if this fetcher can handle the given URL
    fn matches(&self, url: &Url) -> bool;

    /// Fetch the resource at the URL
    ///
    /// Called only if `matches()` returned true.
    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchedResource, FetchError>;
}

/// Registry of fetchers that dispatches to the appropriate handler
///
/// Maintains an ordered list of fetchers. When fetching a URL, iterates
/// through fetchers and uses the first one that matches.
pub struct FetcherRegistry {
    fetchers: Vec<Box<dyn Fetcher>>,
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field(
                "fetchers",
                &self.fetchers.iter().map(|x| x.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FetcherRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            fetchers: Vec::new(),
        }
    }

    /// Create a registry with the built-in fetchers pre-registered
    ///
    /// Includes (in order):
    /// 1. FileFetcher - handles `file://` URLs
    /// 2. HttpFetcher - handles http/https URLs
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FileFetcher::new()));
        registry.register(Box::new(HttpFetcher::new()));
        registry
    }

    /// Register a fetcher
    ///
    /// Fetchers are checked in registration order.
    pub fn register(&mut self, fetcher: Box<dyn Fetcher>) {
        self.fetchers.push(fetcher);
    }

    /// Fetch a URL using the appropriate fetcher
    ///
    /// Returns [`FetchError::UnsupportedScheme`] when no fetcher matches.
    pub async fn fetch(
        &self,
        url: &Url,
        config: &FetchConfig,
    ) -> Result<FetchedResource, FetchError> {
        for fetcher in &self.fetchers {
            if fetcher.matches(url) {
                tracing::debug!(fetcher = fetcher.name(), url = %url, "Fetching resource");
                return fetcher.fetch(url, config).await;
            }
        }

        Err(FetchError::UnsupportedScheme(url.scheme().to_string()))
    }

    /// Resolve a reference against a base URL, then fetch it
    ///
    /// Returns the resolved URL along with the resource so callers can
    /// attribute the result (or a failure) to a concrete location.
    pub async fn fetch_relative(
        &self,
        base: &Url,
        target: &str,
        config: &FetchConfig,
    ) -> Result<(Url, FetchedResource), FetchError> {
        let url = base.join(target).map_err(|e| FetchError::InvalidUrl {
            url: target.to_string(),
            source: e,
        })?;
        let resource = self.fetch(&url, config).await?;
        Ok((url, resource))
    }
}
