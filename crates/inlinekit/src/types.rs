//! Core types for inlinekit

use serde::Serialize;
use url::Url;

/// Kind of external resource referenced by a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// CSS stylesheet (`<link rel="stylesheet">` or `@import`)
    Stylesheet,
    /// JavaScript (`<script src>`)
    Script,
    /// Raster image, inlined as a `data:` URL
    RasterImage,
    /// SVG image, spliced as markup in HTML or a `data:` URL in CSS
    SvgImage,
    /// Font file referenced from CSS `url()`
    Font,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Stylesheet => write!(f, "stylesheet"),
            ResourceKind::Script => write!(f, "script"),
            ResourceKind::RasterImage => write!(f, "image"),
            ResourceKind::SvgImage => write!(f, "svg"),
            ResourceKind::Font => write!(f, "font"),
        }
    }
}

/// A sub-resource that could not be inlined
///
/// The original reference in the document is left untouched.
#[derive(Debug, Clone, Serialize)]
pub struct InlineFailure {
    /// The reference as it appeared in the document, or its resolved URL
    pub url: String,
    /// What kind of resource the reference pointed at
    pub kind: ResourceKind,
    /// Why the resource could not be inlined
    pub error: String,
}

/// Success/failure accounting for one inlining run
#[derive(Debug, Clone, Default, Serialize)]
pub struct InlineReport {
    /// Number of resources embedded into the document
    pub inlined: usize,
    /// Sub-resources that were left as external references
    pub failures: Vec<InlineFailure>,
}

impl InlineReport {
    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.inlined + self.failures.len()
    }

    /// Check if any failures occurred
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Result of a successful inlining run
#[derive(Debug, Clone)]
pub struct InlineOutput {
    /// The rewritten HTML document
    pub html: String,
    /// Base URL the document's references were resolved against
    pub base_url: Url,
    /// What was inlined and what was left behind
    pub report: InlineReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counters() {
        let mut report = InlineReport::default();
        assert_eq!(report.total(), 0);
        assert!(!report.has_failures());

        report.inlined = 3;
        report.failures.push(InlineFailure {
            url: "missing.png".to_string(),
            kind: ResourceKind::RasterImage,
            error: "Server returned status 404".to_string(),
        });
        assert_eq!(report.total(), 4);
        assert!(report.has_failures());
    }

    #[test]
    fn test_report_serialization() {
        let report = InlineReport {
            inlined: 1,
            failures: vec![InlineFailure {
                url: "font.woff".to_string(),
                kind: ResourceKind::Font,
                error: "Request timed out".to_string(),
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"inlined\":1"));
        assert!(json.contains("\"kind\":\"font\""));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::Stylesheet.to_string(), "stylesheet");
        assert_eq!(ResourceKind::SvgImage.to_string(), "svg");
    }
}
