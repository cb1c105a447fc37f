//! Extension to MIME type resolution.
//!
//! The table below is the whole contract: no content sniffing, and any
//! extension not listed resolves to [`FALLBACK_MIME`].

use std::path::Path;

/// MIME type served for unknown or missing extensions.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Lower-case extension (without dot) → MIME type.
///
/// When several extensions share a type, the first one listed is the
/// canonical extension returned by [`extension_for_mime`].
const MIME_TABLE: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("pdf", "application/pdf"),
];

/// Resolve an extension (case-insensitive, leading dot optional) to a MIME type.
pub fn mime_for_extension(ext: &str) -> &'static str {
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    MIME_TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_MIME)
}

/// Resolve the MIME type of a file from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(mime_for_extension)
        .unwrap_or(FALLBACK_MIME)
}

/// Canonical extension for a known MIME type, ignoring any parameters
/// (`image/png; charset=binary` → `png`).
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or("").trim();
    MIME_TABLE
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(essence))
        .map(|(ext, _)| *ext)
}
