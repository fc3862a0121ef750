//! HTTP/HTTPS fetcher
//!
//! Handles network resources with a bounded per-request timeout and a
//! streamed body read that enforces the configured size cap.

use crate::error::FetchError;
use crate::fetchers::{FetchConfig, FetchedResource, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use url::Url;

/// HTTP/HTTPS fetcher backed by reqwest
pub struct HttpFetcher;

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new() -> Self {
        Self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn matches(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchedResource, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(crate::DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(FetchError::ClientBuild)?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let media_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Reject oversized bodies up front when the server declares a length
        if let Some(expected) = response.content_length() {
            if expected > config.max_size as u64 {
                return Err(FetchError::TooLarge {
                    limit: config.max_size,
                });
            }
        }

        let bytes = read_body_capped(response, config.max_size).await?;

        Ok(FetchedResource { bytes, media_type })
    }
}

/// Read a response body, enforcing the size cap while streaming
///
/// The Content-Length check above is advisory only; this is the second
/// line of defense against servers that lie or omit the header.
async fn read_body_capped(response: reqwest::Response, max_size: usize) -> Result<Bytes, FetchError> {
    let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_reqwest)?;
        if body.len() + chunk.len() > max_size {
            return Err(FetchError::TooLarge { limit: max_size });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_http_schemes() {
        let fetcher = HttpFetcher::new();
        assert!(fetcher.matches(&Url::parse("http://example.com/").unwrap()));
        assert!(fetcher.matches(&Url::parse("https://example.com/a.css").unwrap()));
        assert!(!fetcher.matches(&Url::parse("file:///tmp/a.css").unwrap()));
    }

    #[tokio::test]
    async fn test_fetch_status_and_media_type() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/style.css"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("body{color:red}", "text/css"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let url = Url::parse(&format!("{}/style.css", server.uri())).unwrap();
        let resource = fetcher.fetch(&url, &FetchConfig::default()).await.unwrap();

        assert_eq!(resource.media_type.as_deref(), Some("text/css"));
        assert_eq!(&resource.bytes[..], b"body{color:red}");
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let url = Url::parse(&format!("{}/missing.png", server.uri())).unwrap();
        let result = fetcher.fetch(&url, &FetchConfig::default()).await;

        assert!(matches!(result, Err(FetchError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_fetch_body_over_cap_is_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let url = Url::parse(&format!("{}/big.bin", server.uri())).unwrap();
        let config = FetchConfig {
            max_size: 1024,
            ..Default::default()
        };
        let result = fetcher.fetch(&url, &config).await;

        assert!(matches!(result, Err(FetchError::TooLarge { limit: 1024 })));
    }
}
