//! Data-URL encoding and media type detection
//!
//! Stateless helpers shared by the HTML and CSS resolvers. Media type
//! detection prefers the transport's Content-Type, then magic bytes,
//! then the file extension.

use base64::Engine;
use url::Url;

/// Media type used when nothing better can be determined
pub(crate) const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Magic-byte signatures for formats worth recognizing without metadata
const FILE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
];

/// Map a file extension to a media type
pub(crate) fn media_type_for_extension(path: &str) -> Option<&'static str> {
    let lowercased = path.to_lowercase();
    let ext = lowercased.rsplit('.').next()?;
    match ext {
        "html" | "htm" => Some("text/html"),
        "css" => Some("text/css"),
        "js" | "mjs" => Some("application/javascript"),
        "json" => Some("application/json"),
        "svg" => Some(SVG_MEDIA_TYPE),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "ico" => Some("image/x-icon"),
        "woff" => Some("font/woff"),
        "woff2" => Some("font/woff2"),
        "ttf" => Some("font/ttf"),
        "otf" => Some("font/otf"),
        "eot" => Some("application/vnd.ms-fontobject"),
        _ => None,
    }
}

/// Determine the media type of a fetched resource
///
/// `transport` is the Content-Type reported by the fetcher, if any; a bare
/// `application/octet-stream` is ignored since servers routinely mislabel
/// fonts and images that way.
pub(crate) fn detect_media_type(bytes: &[u8], url: &Url, transport: Option<&str>) -> String {
    if let Some(reported) = transport {
        let media_type = reported
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if !media_type.is_empty() && media_type != FALLBACK_MEDIA_TYPE {
            return media_type;
        }
    }

    for (signature, media_type) in FILE_SIGNATURES {
        if bytes.starts_with(signature) {
            return (*media_type).to_string();
        }
    }
    // RIFF containers carry the format tag at offset 8
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "image/webp".to_string();
    }
    if sniff_svg(bytes) {
        return SVG_MEDIA_TYPE.to_string();
    }

    media_type_for_extension(url.path())
        .unwrap_or(FALLBACK_MEDIA_TYPE)
        .to_string()
}

/// Convert resource bytes to a `data:` URL of the given media type
pub(crate) fn data_url(media_type: &str, bytes: &[u8]) -> String {
    let capacity =
        base64::encoded_len(bytes.len(), false).unwrap_or(0) + media_type.len() + "data:;base64,".len();
    let mut out = String::with_capacity(capacity);
    out.push_str("data:");
    out.push_str(media_type);
    out.push_str(";base64,");
    base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut out);
    out
}

/// Check whether a fetched image is SVG
pub(crate) fn is_svg(bytes: &[u8], url: &Url, transport: Option<&str>) -> bool {
    if let Some(reported) = transport {
        if reported.trim().to_ascii_lowercase().starts_with(SVG_MEDIA_TYPE) {
            return true;
        }
    }
    if url.path().to_lowercase().ends_with(".svg") {
        return true;
    }
    sniff_svg(bytes)
}

/// Look for an `<svg` root tag near the start of the content
///
/// Tolerates an XML prolog, a DOCTYPE, and leading comments/whitespace.
fn sniff_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let mut rest = text.trim_start();
    loop {
        if rest.starts_with("<?") || rest.starts_with("<!") {
            match rest.find('>') {
                Some(end) => rest = rest[end + 1..].trim_start(),
                None => return false,
            }
        } else {
            break;
        }
    }
    rest.starts_with("<svg")
}

/// Prepare SVG markup for splicing into an HTML document
///
/// Strips the XML declaration and comments out any DOCTYPE, neither of
/// which is valid inside an HTML body.
pub(crate) fn clean_svg(text: &str) -> String {
    let mut out = text.trim_start().to_string();

    if out.starts_with("<?xml") {
        if let Some(end) = out.find("?>") {
            out.replace_range(..end + 2, "");
        }
    }

    if let Some(start) = out.find("<!DOCTYPE") {
        if let Some(offset) = out[start..].find('>') {
            let end = start + offset + 1;
            let doctype = out[start..end].to_string();
            out.replace_range(start..end, &format!("<!--{doctype}-->"));
        }
    }

    out.trim_start().to_string()
}
