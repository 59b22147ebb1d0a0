/// Content-type classification and JSON-safe encoding of file bytes
///
/// Decides whether retrieved bytes are shipped as UTF-8 text or as base64
/// inside JSON responses. The decision uses the declared MIME type first and
/// the filename extension only when the MIME type says nothing useful.
pub mod tables;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tables::{GENERIC_BINARY_SET, TEXT_EXTENSION_SET, TEXT_MIME_SET, TEXT_MIME_SUFFIXES};
use tracing::warn;

/// How `EncodedContent::text` must be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Utf8,
    Base64,
}

/// Textual projection of file content for JSON transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedContent {
    pub text: String,
    pub encoding: ContentEncoding,
    pub is_text: bool,
}

/// Lower-case a MIME type and drop any parameters (`; charset=...`)
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Extension of `filename`, lower-cased, without the dot
fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn has_text_extension(filename: Option<&str>) -> bool {
    filename
        .and_then(extension)
        .map(|ext| TEXT_EXTENSION_SET.contains(ext.as_str()))
        .unwrap_or(false)
}

/// Decide whether content with this MIME type (and optional filename) is text
pub fn classify(mime_type: &str, filename: Option<&str>) -> bool {
    let mime = normalize_mime(mime_type);

    if mime.is_empty() {
        return has_text_extension(filename);
    }

    if TEXT_MIME_SET.contains(mime.as_str()) {
        return true;
    }

    if mime.starts_with("text/") || TEXT_MIME_SUFFIXES.iter().any(|s| mime.ends_with(s)) {
        return true;
    }

    if GENERIC_BINARY_SET.contains(mime.as_str()) {
        return has_text_extension(filename);
    }

    false
}

/// Encode file bytes for a JSON response.
///
/// Text content is decoded lossily and rejected if the result holds a
/// U+FFFD replacement character anywhere, including one that was already
/// present in valid input. Rejected or binary content is base64-encoded.
pub fn encode(content: &[u8], mime_type: &str, filename: Option<&str>) -> EncodedContent {
    if classify(mime_type, filename) {
        let decoded = String::from_utf8_lossy(content);
        if !decoded.contains('\u{FFFD}') {
            return EncodedContent {
                text: decoded.into_owned(),
                encoding: ContentEncoding::Utf8,
                is_text: true,
            };
        }

        warn!(
            mime_type = %mime_type,
            filename = filename.unwrap_or(""),
            size = content.len(),
            "utf8_decode_fallback: text content is not clean UTF-8, using base64"
        );
    }

    EncodedContent {
        text: BASE64.encode(content),
        encoding: ContentEncoding::Base64,
        is_text: false,
    }
}
