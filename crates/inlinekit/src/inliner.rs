//! Page inlining orchestration
//!
//! The [`Inliner`] drives the whole pipeline: fetch the root document,
//! scan it for resource references, fetch every referenced resource
//! concurrently, then rewrite the document with the fetched content
//! embedded. Sub-resource failures degrade the result instead of
//! failing it; only the root document fetch is fatal.

use crate::css::{self, CssOutcome};
use crate::error::InlineError;
use crate::fetchers::{FetchConfig, FetcherRegistry};
use crate::html::{self, Replacements};
use crate::types::{InlineFailure, InlineOutput, InlineReport, ResourceKind};
use futures::future::join_all;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Builder for [`Inliner`]
#[derive(Debug, Default)]
pub struct InlinerBuilder {
    user_agent: Option<String>,
    timeout: Option<Duration>,
    max_resource_size: Option<usize>,
    registry: Option<FetcherRegistry>,
}

impl InlinerBuilder {
    /// Set the User-Agent header sent with HTTP requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum size of a single fetched resource in bytes
    pub fn max_resource_size(mut self, max_size: usize) -> Self {
        self.max_resource_size = Some(max_size);
        self
    }

    /// Replace the default fetcher registry
    pub fn registry(mut self, registry: FetcherRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the configured [`Inliner`]
    pub fn build(self) -> Inliner {
        let mut config = FetchConfig::default();
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(max_size) = self.max_resource_size {
            config.max_size = max_size;
        }
        Inliner {
            registry: self.registry.unwrap_or_else(FetcherRegistry::with_defaults),
            config,
        }
    }
}

/// Embeds the sub-resources of a web page into the page itself
pub struct Inliner {
    registry: FetcherRegistry,
    config: FetchConfig,
}

impl Default for Inliner {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Content fetched for one `<img>` reference
enum ImageInline {
    /// Raw SVG markup spliced in place of the element
    Svg(String),
    /// `data:` URL replacing the `src` attribute
    Data(String),
}

impl Inliner {
    pub fn builder() -> InlinerBuilder {
        InlinerBuilder::default()
    }

    /// Inline a page given a URL or a local filesystem path
    ///
    /// Returns the rewritten document together with a report of what
    /// was embedded and what was left untouched. Fails only when the
    /// target itself cannot be resolved or fetched.
    pub async fn run(&self, target: &str) -> Result<InlineOutput, InlineError> {
        let base_url = normalize_target(target)?;

        let root = self
            .registry
            .fetch(&base_url, &self.config)
            .await
            .map_err(|source| InlineError::RootFetch {
                url: base_url.to_string(),
                source,
            })?;
        let page = String::from_utf8_lossy(&root.bytes).into_owned();

        let refs = html::scan(&page)?;
        let stylesheets = dedup(refs.stylesheets);
        let scripts = dedup(refs.scripts);
        let images = dedup(refs.images);
        tracing::info!(
            url = %base_url,
            stylesheets = stylesheets.len(),
            scripts = scripts.len(),
            images = images.len(),
            "Inlining page"
        );

        let (style_results, script_results, image_results, block_results) = futures::join!(
            join_all(
                stylesheets
                    .iter()
                    .map(|href| self.fetch_stylesheet(&base_url, href))
            ),
            join_all(scripts.iter().map(|src| self.fetch_script(&base_url, src))),
            join_all(images.iter().map(|src| self.fetch_image(&base_url, src))),
            join_all(
                refs.style_blocks
                    .iter()
                    .enumerate()
                    .map(|(index, text)| self.resolve_style_block(&base_url, index, text))
            ),
        );

        let mut replacements = Replacements::default();
        let mut report = InlineReport::default();

        for (href, result) in style_results {
            match result {
                Ok((resolved, outcome)) => {
                    report.inlined += 1 + outcome.inlined;
                    report.failures.extend(outcome.failures);
                    replacements.styles.insert(href, resolved);
                }
                Err(failure) => report.failures.push(failure),
            }
        }
        for (src, result) in script_results {
            match result {
                Ok(source) => {
                    report.inlined += 1;
                    replacements.scripts.insert(src, source);
                }
                Err(failure) => report.failures.push(failure),
            }
        }
        for (src, result) in image_results {
            match result {
                Ok(ImageInline::Svg(markup)) => {
                    report.inlined += 1;
                    replacements.svgs.insert(src, markup);
                }
                Ok(ImageInline::Data(data)) => {
                    report.inlined += 1;
                    replacements.images.insert(src, data);
                }
                Err(failure) => report.failures.push(failure),
            }
        }
        for (index, result) in block_results.into_iter().flatten() {
            let (resolved, outcome) = result;
            report.inlined += outcome.inlined;
            report.failures.extend(outcome.failures);
            replacements.style_blocks.insert(index, resolved);
        }

        let html = if replacements.is_empty() {
            page
        } else {
            html::rewrite(&page, &replacements)?
        };
        tracing::info!(
            inlined = report.inlined,
            failed = report.failures.len(),
            "Inlining finished"
        );

        Ok(InlineOutput {
            html,
            base_url,
            report,
        })
    }

    /// Fetch a linked stylesheet and resolve its own references
    async fn fetch_stylesheet(
        &self,
        base: &Url,
        href: &str,
    ) -> (String, Result<(String, CssOutcome), InlineFailure>) {
        let result = match self.registry.fetch_relative(base, href, &self.config).await {
            Ok((url, resource)) => {
                let text = String::from_utf8_lossy(&resource.bytes).into_owned();
                Ok(css::resolve_stylesheet(&self.registry, &self.config, text, url, 0).await)
            }
            Err(error) => Err(failure(href, ResourceKind::Stylesheet, error.to_string())),
        };
        if let Err(failure) = &result {
            tracing::warn!(url = %failure.url, error = %failure.error, "Leaving stylesheet link untouched");
        }
        (href.to_string(), result)
    }

    async fn fetch_script(&self, base: &Url, src: &str) -> (String, Result<String, InlineFailure>) {
        let result = match self.registry.fetch_relative(base, src, &self.config).await {
            Ok((url, resource)) => {
                tracing::info!(url = %url, "Inlining script");
                Ok(String::from_utf8_lossy(&resource.bytes).into_owned())
            }
            Err(error) => {
                let failure = failure(src, ResourceKind::Script, error.to_string());
                tracing::warn!(url = %failure.url, error = %failure.error, "Leaving script untouched");
                Err(failure)
            }
        };
        (src.to_string(), result)
    }

    /// Fetch an image; SVG content is spliced as markup, everything
    /// else becomes a `data:` URL in the `src` attribute
    async fn fetch_image(
        &self,
        base: &Url,
        src: &str,
    ) -> (String, Result<ImageInline, InlineFailure>) {
        let result = match self.registry.fetch_relative(base, src, &self.config).await {
            Ok((url, resource)) => {
                let transport = resource.media_type.as_deref();
                if crate::encode::is_svg(&resource.bytes, &url, transport) {
                    tracing::info!(url = %url, "Splicing SVG image");
                    let text = String::from_utf8_lossy(&resource.bytes);
                    Ok(ImageInline::Svg(crate::encode::clean_svg(&text)))
                } else {
                    let media_type = crate::encode::detect_media_type(&resource.bytes, &url, transport);
                    tracing::info!(url = %url, media_type = %media_type, "Inlining image");
                    Ok(ImageInline::Data(crate::encode::data_url(
                        &media_type,
                        &resource.bytes,
                    )))
                }
            }
            Err(error) => {
                let failure = failure(src, css::classify_target(src), error.to_string());
                tracing::warn!(url = %failure.url, error = %failure.error, "Leaving image untouched");
                Err(failure)
            }
        };
        (src.to_string(), result)
    }

    /// Resolve references inside an inline `<style>` block
    ///
    /// Blocks without references are skipped entirely so their text is
    /// never rewritten.
    async fn resolve_style_block(
        &self,
        base: &Url,
        index: usize,
        text: &str,
    ) -> Option<(usize, (String, CssOutcome))> {
        if !css::has_references(text) {
            return None;
        }
        let resolved = css::resolve_stylesheet(
            &self.registry,
            &self.config,
            text.to_string(),
            base.clone(),
            0,
        )
        .await;
        Some((index, resolved))
    }
}

fn failure(url: &str, kind: ResourceKind, error: String) -> InlineFailure {
    InlineFailure {
        url: url.to_string(),
        kind,
        error,
    }
}

/// First occurrence wins; order is preserved
fn dedup(refs: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    refs.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

/// Turn a user-supplied target into an absolute URL
///
/// Absolute URLs pass through as-is; anything else is treated as a
/// local filesystem path and must exist.
fn normalize_target(target: &str) -> Result<Url, InlineError> {
    if let Ok(url) = Url::parse(target) {
        // Single-letter schemes are Windows drive letters, not URLs
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = std::fs::canonicalize(target)
        .map_err(|_| InlineError::UnsupportedTarget(target.to_string()))?;
    Url::from_file_path(&path).map_err(|_| InlineError::UnsupportedTarget(target.to_string()))
}
