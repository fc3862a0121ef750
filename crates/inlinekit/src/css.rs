//! CSS resolution
//!
//! Stylesheet text is processed in a single left-to-right scan.
//! `@import` statements are replaced by the recursively resolved sheet
//! they point at; `url()` tokens (fonts, background images) become
//! `data:` URLs. Everything else, comments and strings included, is
//! copied through verbatim, so untouched CSS survives byte-for-byte.
//!
//! SVG targets inside CSS are always encoded as `data:image/svg+xml`
//! URLs; CSS syntax admits only a URL token where markup cannot go.

use crate::encode::{data_url, detect_media_type, media_type_for_extension};
use crate::error::FetchError;
use crate::fetchers::{FetchConfig, FetcherRegistry};
use crate::types::{InlineFailure, ResourceKind};
use futures::future::BoxFuture;
use url::Url;

/// Nested `@import` chains deeper than this are treated as cycles
pub(crate) const MAX_IMPORT_DEPTH: u8 = 8;

/// Accounting for one stylesheet resolution, nested imports included
#[derive(Debug, Default)]
pub(crate) struct CssOutcome {
    pub inlined: usize,
    pub failures: Vec<InlineFailure>,
}

/// Cheap pre-check so reference-free stylesheets are never rewritten
pub(crate) fn has_references(css: &str) -> bool {
    let lowered = css.to_ascii_lowercase();
    lowered.contains("@import") || lowered.contains("url(")
}

/// Resolve a stylesheet against its own location
///
/// `base` must be the URL the stylesheet was fetched from so relative
/// references inside it resolve correctly. Failed fetches leave the
/// original token in place and are recorded in the outcome.
pub(crate) fn resolve_stylesheet<'a>(
    registry: &'a FetcherRegistry,
    config: &'a FetchConfig,
    css: String,
    base: Url,
    depth: u8,
) -> BoxFuture<'a, (String, CssOutcome)> {
    Box::pin(async move {
        let mut out = String::with_capacity(css.len());
        let mut outcome = CssOutcome::default();
        let mut i = 0;

        while i < css.len() {
            let rest = &css[i..];

            // Comments and strings pass through unscanned
            if rest.starts_with("/*") {
                let end = rest.find("*/").map(|p| i + p + 2).unwrap_or(css.len());
                out.push_str(&css[i..end]);
                i = end;
                continue;
            }
            if rest.starts_with('"') || rest.starts_with('\'') {
                let end = i + string_token_len(rest);
                out.push_str(&css[i..end]);
                i = end;
                continue;
            }

            if starts_with_ignore_case(rest, "@import") {
                if let Some(import) = parse_import(rest) {
                    let statement = &css[i..i + import.len];
                    match inline_import(registry, config, &base, &import.target, depth).await {
                        Ok((resolved, nested)) => {
                            outcome.inlined += 1 + nested.inlined;
                            outcome.failures.extend(nested.failures);
                            out.push_str(&resolved);
                        }
                        Err(failure) => {
                            tracing::warn!(url = %failure.url, error = %failure.error, "Leaving @import unresolved");
                            outcome.failures.push(failure);
                            out.push_str(statement);
                        }
                    }
                    i += import.len;
                    continue;
                }
            }

            if starts_with_ignore_case(rest, "url(") && !prev_is_ident(&out) {
                if let Some(token) = parse_url_token(rest) {
                    let original = &css[i..i + token.len];
                    if skip_target(&token.target) {
                        out.push_str(original);
                    } else {
                        match inline_css_url(registry, config, &base, &token.target).await {
                            Ok(data) => {
                                outcome.inlined += 1;
                                out.push_str("url(");
                                if let Some(q) = token.quote {
                                    out.push(q);
                                }
                                out.push_str(&data);
                                if let Some(q) = token.quote {
                                    out.push(q);
                                }
                                out.push(')');
                            }
                            Err(failure) => {
                                tracing::warn!(url = %failure.url, error = %failure.error, "Leaving url() unresolved");
                                outcome.failures.push(failure);
                                out.push_str(original);
                            }
                        }
                    }
                    i += token.len;
                    continue;
                }
            }

            let step = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            out.push_str(&rest[..step]);
            i += step;
        }

        (out, outcome)
    })
}

/// Fetch an imported stylesheet and resolve it against its own URL
async fn inline_import(
    registry: &FetcherRegistry,
    config: &FetchConfig,
    base: &Url,
    target: &str,
    depth: u8,
) -> Result<(String, CssOutcome), InlineFailure> {
    if depth >= MAX_IMPORT_DEPTH {
        return Err(InlineFailure {
            url: target.to_string(),
            kind: ResourceKind::Stylesheet,
            error: format!("import depth limit of {MAX_IMPORT_DEPTH} reached"),
        });
    }

    let (url, resource) = registry
        .fetch_relative(base, target, config)
        .await
        .map_err(|e| import_failure(target, e))?;

    tracing::info!(url = %url, "Inlining imported stylesheet");
    let text = String::from_utf8_lossy(&resource.bytes).into_owned();
    Ok(resolve_stylesheet(registry, config, text, url, depth + 1).await)
}

fn import_failure(target: &str, error: FetchError) -> InlineFailure {
    InlineFailure {
        url: target.to_string(),
        kind: ResourceKind::Stylesheet,
        error: error.to_string(),
    }
}

/// Fetch a `url()` target and encode it as a data URL
async fn inline_css_url(
    registry: &FetcherRegistry,
    config: &FetchConfig,
    base: &Url,
    target: &str,
) -> Result<String, InlineFailure> {
    let kind = classify_target(target);
    let (url, resource) = registry
        .fetch_relative(base, target, config)
        .await
        .map_err(|e| InlineFailure {
            url: target.to_string(),
            kind,
            error: e.to_string(),
        })?;

    let media_type = detect_media_type(&resource.bytes, &url, resource.media_type.as_deref());
    tracing::info!(url = %url, media_type = %media_type, "Inlining CSS resource");
    Ok(data_url(&media_type, &resource.bytes))
}

/// Targets that are already inline or purely document-local
fn skip_target(target: &str) -> bool {
    target.is_empty() || target.starts_with("data:") || target.starts_with('#')
}

/// Best-effort resource kind for failure reporting
///
/// Query and fragment suffixes are ignored when reading the extension.
pub(crate) fn classify_target(target: &str) -> ResourceKind {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    match media_type_for_extension(path) {
        Some(t) if t.starts_with("font/") || t == "application/vnd.ms-fontobject" => {
            ResourceKind::Font
        }
        Some("image/svg+xml") => ResourceKind::SvgImage,
        _ => ResourceKind::RasterImage,
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// `url(` must not be the tail of a longer identifier (e.g. `-moz-url(`)
fn prev_is_ident(out: &str) -> bool {
    out.chars()
        .last()
        .map(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .unwrap_or(false)
}

/// Length of a quoted string token starting at the beginning of `rest`
fn string_token_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let quote = bytes[0];
    let mut pos = 1;
    while pos < bytes.len() {
        if bytes[pos] == b'\\' {
            pos += 2;
            continue;
        }
        if bytes[pos] == quote {
            return pos + 1;
        }
        pos += 1;
    }
    rest.len()
}

/// A `url(...)` token
struct UrlToken {
    /// Token length in bytes, closing parenthesis included
    len: usize,
    /// Quote character around the target, if any
    quote: Option<char>,
    /// The target with quotes and surrounding whitespace removed
    target: String,
}

/// Parse a `url(...)` token at the start of `rest`
fn parse_url_token(rest: &str) -> Option<UrlToken> {
    let bytes = rest.as_bytes();
    let mut pos = 4; // past "url("
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos >= bytes.len() {
        return None;
    }

    let quote = match bytes[pos] {
        b'"' => Some('"'),
        b'\'' => Some('\''),
        _ => None,
    };

    if let Some(q) = quote {
        pos += 1;
        let start = pos;
        while pos < bytes.len() {
            if bytes[pos] == b'\\' {
                pos += 2;
                continue;
            }
            if bytes[pos] == q as u8 {
                break;
            }
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        let target = rest[start..pos].to_string();
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b')' {
            return None;
        }
        Some(UrlToken {
            len: pos + 1,
            quote,
            target,
        })
    } else {
        let start = pos;
        while pos < bytes.len() && bytes[pos] != b')' {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        let target = rest[start..pos].trim().to_string();
        Some(UrlToken {
            len: pos + 1,
            quote: None,
            target,
        })
    }
}

/// An `@import ...;` statement
struct ImportStatement {
    /// Statement length in bytes, terminating semicolon included
    len: usize,
    /// The imported stylesheet reference
    target: String,
}

/// Parse an `@import` statement at the start of `rest`
///
/// Accepts both `@import url(...)` and `@import "..."` forms. The
/// semicolon is searched for after the target token so targets that
/// themselves contain semicolons (font service URLs) do not truncate
/// the statement.
fn parse_import(rest: &str) -> Option<ImportStatement> {
    let after = &rest[7..]; // past "@import"
    let ws = after.len() - after.trim_start().len();
    if ws == 0 {
        return None;
    }
    let body_start = 7 + ws;
    let body = &rest[body_start..];

    let (target, token_end) = if starts_with_ignore_case(body, "url(") {
        let token = parse_url_token(body)?;
        (token.target, body_start + token.len)
    } else if body.starts_with('"') || body.starts_with('\'') {
        let quote = body.chars().next()?;
        let inner = &body[1..];
        let end = inner.find(quote)?;
        (inner[..end].to_string(), body_start + end + 2)
    } else {
        return None;
    };

    let len = rest[token_end..]
        .find(';')
        .map(|p| token_end + p + 1)
        .unwrap_or(rest.len());

    Some(ImportStatement { len, target })
}
