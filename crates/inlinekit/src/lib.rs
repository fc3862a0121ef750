//! inlinekit - self-contained web page inliner
//!
//! This crate fetches an HTML document together with the external resources
//! it references (stylesheets, scripts, fonts, images) and produces a single
//! document with those resources embedded inline, viewable offline without
//! further network access.
//!
//! ## Fetcher System
//!
//! Resources are retrieved through a pluggable fetcher system where each
//! fetcher handles a URL scheme. The [`FetcherRegistry`] dispatches requests
//! to the appropriate fetcher.
//!
//! Built-in fetchers:
//! - [`FileFetcher`] - `file://` URLs read from the local filesystem
//! - [`HttpFetcher`] - HTTP/HTTPS URLs fetched over the network
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> Result<(), inlinekit::InlineError> {
//! let output = inlinekit::inline("https://example.com").await?;
//! println!("{}", output.html);
//! # Ok(())
//! # }
//! ```

mod css;
mod encode;
mod error;
pub mod fetchers;
mod html;
mod inliner;
mod types;

pub use error::{FetchError, InlineError};
pub use fetchers::{FetchConfig, FetchedResource, Fetcher, FetcherRegistry, FileFetcher, HttpFetcher};
pub use inliner::{Inliner, InlinerBuilder};
pub use types::{InlineFailure, InlineOutput, InlineReport, ResourceKind};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; inlinekit/0.1)";

/// Inline a page with default settings
///
/// The target may be an HTTP(S) URL, a `file://` URL, or a local
/// filesystem path. For custom configuration, use [`Inliner::builder`].
pub async fn inline(target: &str) -> Result<InlineOutput, InlineError> {
    Inliner::default().run(target).await
}
