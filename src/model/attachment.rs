//! Attachment references, save options and stored metadata.
//!
//! Bytes are never kept here. A reference only locates a stored file; the
//! content is read on demand by the store.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::mime;
use crate::model::account::AccountId;

/// What kind of document an attachment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// A bill to be paid.
    Invoice,
    /// Proof of a payment made.
    Receipt,
}

impl AttachmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, StoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            other => Err(StoreError::invalid(format!(
                "unknown attachment kind '{other}' (expected invoice or receipt)"
            ))),
        }
    }
}

/// Descriptive metadata supplied with a buffer to save.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Owning account. Determines the storage subdirectory.
    pub account_id: AccountId,

    /// Caller-supplied display name. Kept verbatim as metadata; only a
    /// sanitized form reaches the filesystem. May be empty.
    pub original_name: String,

    /// Declared MIME type. Only consulted for the extension when
    /// `original_name` has none.
    pub declared_type: Option<String>,

    /// Invoice or receipt, if the caller knows.
    pub kind: Option<AttachmentKind>,

    /// Free-form note stored alongside the attachment.
    pub info: Option<String>,
}

impl SaveOptions {
    pub fn new(account_id: AccountId, original_name: impl Into<String>) -> Self {
        Self {
            account_id,
            original_name: original_name.into(),
            declared_type: None,
            kind: None,
            info: None,
        }
    }

    pub fn with_declared_type(mut self, mime: impl Into<String>) -> Self {
        self.declared_type = Some(mime.into());
        self
    }

    pub fn with_kind(mut self, kind: AttachmentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

/// Metadata persisted next to each attachment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentMeta {
    /// Name as supplied by the caller, unsanitized.
    pub original_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AttachmentKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    /// When the attachment was saved.
    pub saved_at: DateTime<Utc>,
}

impl AttachmentMeta {
    pub fn from_options(options: &SaveOptions, saved_at: DateTime<Utc>) -> Self {
        Self {
            original_name: options.original_name.clone(),
            kind: options.kind,
            info: options.info.clone(),
            saved_at,
        }
    }
}

/// Handle to a stored attachment, returned by `save` and `list_by_account`.
///
/// Remains valid until the file is removed or moved outside the store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentRef {
    /// Owning account.
    pub account_id: AccountId,

    /// On-disk filename: `<base>_<token>.<ext>`.
    pub stored_name: String,

    /// Resolved path of the file.
    pub path: PathBuf,

    /// Caller-supplied name, or the stored name when none was recorded.
    pub original_name: String,

    pub kind: Option<AttachmentKind>,

    pub info: Option<String>,

    /// Size in bytes at the time the reference was produced.
    pub size: u64,

    /// Save time from the stored metadata; file mtime for files without it.
    pub saved_at: DateTime<Utc>,
}

impl AttachmentRef {
    /// Normalized (lower-case) extension, empty if none.
    pub fn extension(&self) -> String {
        Path::new(&self.stored_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    /// MIME type the payload of this attachment will carry.
    pub fn mime_type(&self) -> &'static str {
        mime::mime_for_path(Path::new(&self.stored_name))
    }
}
