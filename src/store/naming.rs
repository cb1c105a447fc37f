//! Stored-name derivation: sanitize the caller's filename and attach a
//! uniqueness token.
//!
//! Format: `{base}_{token}.{ext}` where `token` is
//! `{UTC timestamp, ms}-{pid}-{counter}`. Metadata for a stored file lives in
//! the hidden sidecar `.{stored_name}.json`.
//!
//! Byte budget against the usual 255-byte filename limit: base 150, `_` 1,
//! token at most 50, `.` plus extension at most 17, sidecar decoration 6.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Base name used when the caller's name sanitizes to nothing.
pub const DEFAULT_BASE: &str = "attachment";

/// Maximum length in UTF-8 bytes of the sanitized base name.
pub const MAX_BASE_BYTES: usize = 150;

/// Maximum length of a normalized extension.
const MAX_EXT_LEN: usize = 16;

/// Process-wide counter; strictly increasing, so tokens never repeat in-process.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A caller-supplied filename reduced to a safe base and a normalized extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    /// Safe stem: alphanumerics, `-` and `_` only. Never empty.
    pub base: String,
    /// Lower-case ASCII alphanumeric extension without the dot. May be empty.
    pub extension: String,
}

/// Reduce an untrusted filename to a [`SanitizedName`].
///
/// Only the last path component survives (both `/` and `\` count as
/// separators), so `../../etc/passwd` becomes `passwd`.
pub fn sanitize_original_name(name: &str) -> SanitizedName {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        return SanitizedName {
            base: DEFAULT_BASE.to_string(),
            extension: String::new(),
        };
    }

    let (stem, ext) = match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext),
        _ => (last, ""),
    };

    SanitizedName {
        base: sanitize_filename_part(stem, MAX_BASE_BYTES),
        extension: normalize_extension(ext),
    }
}

/// Replace anything but alphanumerics, `-` and `_` with `_` and truncate to
/// at most `max_bytes` UTF-8 bytes, never splitting a character.
///
/// Returns [`DEFAULT_BASE`] if nothing meaningful is left.
pub fn sanitize_filename_part(s: &str, max_bytes: usize) -> String {
    let mut sanitized = String::new();
    for c in s.chars() {
        let c = if c.is_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if sanitized.len() + c.len_utf8() > max_bytes {
            break;
        }
        sanitized.push(c);
    }

    if sanitized.chars().all(|c| c == '_') {
        DEFAULT_BASE.to_string()
    } else {
        sanitized
    }
}

/// Lower-case an extension, keep ASCII alphanumerics only, cap its length.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_EXT_LEN)
        .collect()
}

/// Draw a fresh uniqueness token.
///
/// The counter makes tokens distinct inside one process even within the same
/// millisecond; the pid separates concurrent processes sharing a root.
pub fn next_token() -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{n}",
        Utc::now().format("%Y%m%dT%H%M%S%3f"),
        std::process::id()
    )
}

/// Assemble the on-disk filename.
pub fn stored_name(name: &SanitizedName, token: &str) -> String {
    if name.extension.is_empty() {
        format!("{}_{token}", name.base)
    } else {
        format!("{}_{token}.{}", name.base, name.extension)
    }
}

/// Hidden metadata file belonging to `stored_name`.
pub fn sidecar_name(stored_name: &str) -> String {
    format!(".{stored_name}.json")
}

/// `true` if `name` is a single, plain, non-hidden path component.
pub fn is_plain_component(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}
