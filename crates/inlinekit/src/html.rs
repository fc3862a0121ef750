//! HTML scanning and rewriting
//!
//! The document is processed in two streaming passes. The scan pass
//! collects every inlinable reference; once the resources have been
//! fetched, the rewrite pass splices the prepared replacements in place.
//! Everything the rewriter does not touch passes through byte-for-byte.

use crate::error::InlineError;
use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, text, RewriteStrSettings};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// References discovered by the scan pass
///
/// Attribute values are kept exactly as written in the document; they are
/// the keys the rewrite pass matches on.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PageRefs {
    /// `href` of each `<link rel="stylesheet">`
    pub stylesheets: Vec<String>,
    /// `src` of each `<script src>`
    pub scripts: Vec<String>,
    /// `src` of each `<img src>`
    pub images: Vec<String>,
    /// Text of each `<style>` element, in document order
    pub style_blocks: Vec<String>,
}

/// Prepared replacements applied by the rewrite pass
///
/// References absent from every map are left untouched, which is how
/// failed fetches degrade gracefully.
#[derive(Debug, Default)]
pub(crate) struct Replacements {
    /// link href -> resolved stylesheet text
    pub styles: HashMap<String, String>,
    /// script src -> fetched source text
    pub scripts: HashMap<String, String>,
    /// img src -> SVG markup to splice in place of the element
    pub svgs: HashMap<String, String>,
    /// img src -> data: URL
    pub images: HashMap<String, String>,
    /// style element index -> resolved stylesheet text
    pub style_blocks: HashMap<usize, String>,
}

impl Replacements {
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
            && self.scripts.is_empty()
            && self.svgs.is_empty()
            && self.images.is_empty()
            && self.style_blocks.is_empty()
    }
}

/// Targets that are already inline or not fetchable at all
fn skip_target(target: &str) -> bool {
    target.is_empty() || target.starts_with("data:") || target.starts_with('#')
}

/// Stylesheet reference of a `<link>` element
///
/// Loaders that attach stylesheets lazily park the real location in
/// `data-href`, so it serves as the fallback when `href` is absent.
fn link_target(el: &lol_html::html_content::Element) -> Option<String> {
    el.get_attribute("href")
        .or_else(|| el.get_attribute("data-href"))
}

/// Scan the document for inlinable references
pub(crate) fn scan(html: &str) -> Result<PageRefs, InlineError> {
    let refs = RefCell::new(PageRefs::default());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("link[rel=\"stylesheet\"]", |el| {
                    if let Some(href) = link_target(el) {
                        if !skip_target(&href) {
                            refs.borrow_mut().stylesheets.push(href);
                        }
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if !skip_target(&src) {
                            refs.borrow_mut().scripts.push(src);
                        }
                    }
                    Ok(())
                }),
                element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if !skip_target(&src) {
                            refs.borrow_mut().images.push(src);
                        }
                    }
                    Ok(())
                }),
                // One entry per style element, even when empty, so the
                // rewrite pass can address blocks by occurrence index.
                element!("style", |_el| {
                    refs.borrow_mut().style_blocks.push(String::new());
                    Ok(())
                }),
                text!("style", |t| {
                    let mut refs = refs.borrow_mut();
                    if let Some(block) = refs.style_blocks.last_mut() {
                        block.push_str(t.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| InlineError::Rewrite(e.to_string()))?;

    Ok(refs.into_inner())
}

/// Apply prepared replacements to the document
///
/// Content spliced in here is not re-scanned; nested references only
/// exist inside CSS and are resolved before this pass runs.
pub(crate) fn rewrite(html: &str, replacements: &Replacements) -> Result<String, InlineError> {
    let style_index = Cell::new(0usize);

    // Bound to a local so the settings temporary (which borrows
    // style_index through the handlers) is dropped first
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("link[rel=\"stylesheet\"]", |el| {
                    if let Some(href) = link_target(el) {
                        if let Some(css) = replacements.styles.get(&href) {
                            el.replace(&format!("<style>{css}</style>"), ContentType::Html);
                        }
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if let Some(source) = replacements.scripts.get(&src) {
                            el.remove_attribute("src");
                            el.set_inner_content(source, ContentType::Html);
                        }
                    }
                    Ok(())
                }),
                element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if let Some(svg) = replacements.svgs.get(&src) {
                            el.replace(svg, ContentType::Html);
                        } else if let Some(data) = replacements.images.get(&src) {
                            el.set_attribute("src", data)?;
                        }
                    }
                    Ok(())
                }),
                element!("style", |el| {
                    let index = style_index.get();
                    style_index.set(index + 1);
                    if let Some(css) = replacements.style_blocks.get(&index) {
                        el.set_inner_content(css, ContentType::Html);
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| InlineError::Rewrite(e.to_string()));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<link rel="stylesheet" href="a.css">
<link rel="icon" href="favicon.ico">
<style>h1 { color: blue; }</style>
<script src="app.js"></script>
</head>
<body>
<img src="icon.svg" alt="icon">
<img src="photo.png">
<img src="data:image/gif;base64,R0lGOD">
</body>
</html>"#;

    #[test]
    fn test_scan_collects_references() {
        let refs = scan(PAGE).unwrap();
        assert_eq!(refs.stylesheets, vec!["a.css"]);
        assert_eq!(refs.scripts, vec!["app.js"]);
        assert_eq!(refs.images, vec!["icon.svg", "photo.png"]);
        assert_eq!(refs.style_blocks, vec!["h1 { color: blue; }"]);
    }

    #[test]
    fn test_scan_skips_icon_links_and_data_urls() {
        let refs = scan(PAGE).unwrap();
        assert!(!refs.stylesheets.contains(&"favicon.ico".to_string()));
        assert!(refs.images.iter().all(|s| !s.starts_with("data:")));
    }

    #[test]
    fn test_scan_indexes_empty_style_blocks() {
        let refs = scan("<style></style><style>p{}</style>").unwrap();
        assert_eq!(refs.style_blocks, vec!["", "p{}"]);
    }

    #[test]
    fn test_rewrite_link_to_style() {
        let mut rep = Replacements::default();
        rep.styles
            .insert("a.css".to_string(), "body{color:red}".to_string());
        let out = rewrite(r#"<link rel="stylesheet" href="a.css">"#, &rep).unwrap();
        assert_eq!(out, "<style>body{color:red}</style>");
    }

    #[test]
    fn test_link_data_href_fallback() {
        let html = r#"<link rel="stylesheet" data-href="lazy.css">"#;
        let refs = scan(html).unwrap();
        assert_eq!(refs.stylesheets, vec!["lazy.css"]);

        let mut rep = Replacements::default();
        rep.styles
            .insert("lazy.css".to_string(), "b{font-weight:bold}".to_string());
        let out = rewrite(html, &rep).unwrap();
        assert_eq!(out, "<style>b{font-weight:bold}</style>");
    }

    #[test]
    fn test_rewrite_script_body() {
        let mut rep = Replacements::default();
        rep.scripts
            .insert("app.js".to_string(), "console.log(1);".to_string());
        let out = rewrite(r#"<script src="app.js"></script>"#, &rep).unwrap();
        assert_eq!(out, "<script>console.log(1);</script>");
    }

    #[test]
    fn test_rewrite_img_to_svg() {
        let mut rep = Replacements::default();
        rep.svgs
            .insert("icon.svg".to_string(), "<svg><circle/></svg>".to_string());
        let out = rewrite(r#"<p><img src="icon.svg"></p>"#, &rep).unwrap();
        assert_eq!(out, "<p><svg><circle/></svg></p>");
    }

    #[test]
    fn test_rewrite_img_src_to_data_url() {
        let mut rep = Replacements::default();
        rep.images.insert(
            "photo.png".to_string(),
            "data:image/png;base64,YWJj".to_string(),
        );
        let out = rewrite(r#"<img src="photo.png" alt="x">"#, &rep).unwrap();
        assert!(out.contains(r#"src="data:image/png;base64,YWJj""#));
        assert!(out.contains(r#"alt="x""#));
    }

    #[test]
    fn test_rewrite_style_block_by_index() {
        let mut rep = Replacements::default();
        rep.style_blocks.insert(1, "p{margin:0}".to_string());
        let out = rewrite("<style>a{}</style><style>@import url(x);</style>", &rep).unwrap();
        assert_eq!(out, "<style>a{}</style><style>p{margin:0}</style>");
    }

    #[test]
    fn test_rewrite_untouched_markup_is_preserved() {
        let rep = Replacements::default();
        let out = rewrite(PAGE, &rep).unwrap();
        assert_eq!(out, PAGE);
    }

    #[test]
    fn test_rewrite_leaves_unmatched_references() {
        let mut rep = Replacements::default();
        rep.images
            .insert("other.png".to_string(), "data:x".to_string());
        let html = r#"<img src="missing.png">"#;
        let out = rewrite(html, &rep).unwrap();
        assert_eq!(out, html);
    }
}
