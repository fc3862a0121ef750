//! Local file fetcher
//!
//! Handles `file://` URLs so a page saved on disk (and its relative
//! references) can be inlined without a server.

use crate::error::FetchError;
use crate::fetchers::{FetchConfig, FetchedResource, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

/// Fetcher for `file://` URLs
pub struct FileFetcher;

impl FileFetcher {
    /// Create a new file fetcher
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    fn name(&self) -> &'static str {
        "file"
    }

    fn matches(&self, url: &Url) -> bool {
        url.scheme() == "file"
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchedResource, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::UnsupportedScheme("file".to_string()))?;

        let data = tokio::fs::read(&path).await?;
        if data.len() > config.max_size {
            return Err(FetchError::TooLarge {
                limit: config.max_size,
            });
        }

        // No transport-level type for files; the extension is the best hint
        let media_type = crate::encode::media_type_for_extension(url.path()).map(str::to_string);

        Ok(FetchedResource {
            bytes: Bytes::from(data),
            media_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_matches_file_scheme() {
        let fetcher = FileFetcher::new();
        assert!(fetcher.matches(&Url::parse("file:///tmp/page.html").unwrap()));
        assert!(!fetcher.matches(&Url::parse("https://example.com/").unwrap()));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.css");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"p{margin:0}").unwrap();

        let fetcher = FileFetcher::new();
        let url = Url::from_file_path(&path).unwrap();
        let resource = fetcher.fetch(&url, &FetchConfig::default()).await.unwrap();

        assert_eq!(&resource.bytes[..], b"p{margin:0}");
        assert_eq!(resource.media_type.as_deref(), Some("text/css"));
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_error() {
        let fetcher = FileFetcher::new();
        let url = Url::parse("file:///definitely/not/here.css").unwrap();
        let result = fetcher.fetch(&url, &FetchConfig::default()).await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
