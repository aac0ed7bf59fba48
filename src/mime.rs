use mime::Mime;
use std::str::{self, FromStr};

/// Number of leading bytes inspected when sniffing the content type.
pub const SNIFF_LEN: usize = 512;

/// Content type detected from the file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffedType {
    /// Detected media type.
    pub mime: Mime,
    /// Conventional file extension for the media type, if known.
    pub extension: Option<&'static str>,
}

/// Detects the media type of the given bytes.
///
/// Only the first [`SNIFF_LEN`] bytes are inspected. Content that is not
/// recognized by its magic number is reported as `text/plain` when it looks
/// like UTF-8 text and as `application/octet-stream` otherwise.
pub fn sniff(bytes: &[u8]) -> SniffedType {
    let bytes = &bytes[..bytes.len().min(SNIFF_LEN)];
    if let Some(kind) = infer::get(bytes) {
        if let Ok(mime) = Mime::from_str(kind.mime_type()) {
            return SniffedType {
                mime,
                extension: Some(kind.extension()),
            };
        }
    }
    if looks_like_text(bytes) {
        SniffedType {
            mime: mime::TEXT_PLAIN_UTF_8,
            extension: Some("txt"),
        }
    } else {
        SniffedType {
            mime: mime::APPLICATION_OCTET_STREAM,
            extension: None,
        }
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let text = match str::from_utf8(bytes) {
        Ok(text) => text,
        // a multi-byte character cut off by the sniff window
        Err(e) if e.error_len().is_none() => match str::from_utf8(&bytes[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
        Err(_) => return false,
    };
    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c'))
}

/// Checks whether the media type is in the allowed list.
///
/// An empty list permits everything. Entries are compared against the
/// essence of the media type (parameters are ignored) and `type/*` matches
/// any subtype.
pub fn is_allowed(mime: &Mime, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    allowed.iter().any(|entry| {
        let entry = entry.trim().to_ascii_lowercase();
        match entry.split_once('/') {
            Some((type_, "*")) => type_ == mime.type_().as_str(),
            _ => entry == mime.essence_str(),
        }
    })
}
