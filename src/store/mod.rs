//! Attachment store: on-disk layout, writer and reader.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   <account_id>/
//!     <base>_<token>.<ext>
//!     .<base>_<token>.<ext>.json   (metadata sidecar)
//!     .incoming-XXXXXX             (in-flight write, never listed)
//! ```
//!
//! All operations block on filesystem I/O. The store holds no shared mutable
//! state, so one instance may be used from several threads at once; callers
//! that need responsiveness should run these calls off latency-sensitive
//! threads.

pub mod naming;
pub mod reader;
mod sidecar;
pub mod writer;

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::{self, StorageConfig};
use crate::error::{Result, StoreError};
use crate::model::{AccountId, AttachmentMeta, AttachmentRef};

/// Prefix of temporary files in an account directory. Hidden, so listings skip them.
pub(crate) const TEMP_PREFIX: &str = ".incoming-";

/// Default upper bound for a single attachment (64 MB).
pub const DEFAULT_MAX_ATTACHMENT_SIZE: u64 = 64 * 1024 * 1024;

/// Local attachment storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    max_attachment_size: u64,
    sync_writes: bool,
}

impl AttachmentStore {
    /// Create a store rooted at `root`. Nothing is created on disk until the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_attachment_size: DEFAULT_MAX_ATTACHMENT_SIZE,
            sync_writes: true,
        }
    }

    /// Create a store from the `[storage]` configuration section.
    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(config::storage_root(storage))
            .with_max_attachment_size(storage.max_attachment_size)
            .with_sync_writes(storage.sync_writes)
    }

    /// Reject buffers larger than `bytes` with `InvalidInput`.
    pub fn with_max_attachment_size(mut self, bytes: u64) -> Self {
        self.max_attachment_size = bytes;
        self
    }

    /// Whether to `fsync` file contents (and the directory, on Unix) before returning.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the attachments of `account`. May not exist yet.
    pub fn account_dir(&self, account: &AccountId) -> PathBuf {
        self.root.join(account.as_str())
    }
}

/// Assemble a reference. Stored metadata wins; without it the original
/// name falls back to the stored name and the save time to `modified`.
pub(crate) fn build_reference(
    account: &AccountId,
    stored_name: String,
    path: PathBuf,
    size: u64,
    modified: DateTime<Utc>,
    meta: Option<AttachmentMeta>,
) -> AttachmentRef {
    let (original_name, kind, info, saved_at) = match meta {
        Some(m) => (m.original_name, m.kind, m.info, m.saved_at),
        None => (String::new(), None, None, modified),
    };
    let original_name = if original_name.trim().is_empty() {
        stored_name.clone()
    } else {
        original_name
    };
    AttachmentRef {
        account_id: account.clone(),
        stored_name,
        path,
        original_name,
        kind,
        info,
        size,
        saved_at,
    }
}

/// File mtime, or now if the platform cannot report it.
pub(crate) fn modified_time(meta: &Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

impl AttachmentStore {
    /// Path of `stored_name` inside the account directory.
    ///
    /// Only plain, non-hidden file names are accepted, so the result can
    /// never leave the account directory or point at a sidecar.
    pub(crate) fn locate(&self, account: &AccountId, stored_name: &str) -> Result<PathBuf> {
        if !naming::is_plain_component(stored_name) {
            return Err(StoreError::invalid(format!(
                "'{}' is not a stored attachment name",
                stored_name.escape_debug()
            )));
        }
        Ok(self.account_dir(account).join(stored_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_dir_is_under_root() {
        let store = AttachmentStore::new("/data/att");
        let id = AccountId::parse("12").unwrap();
        assert_eq!(store.account_dir(&id), PathBuf::from("/data/att/12"));
    }

    #[test]
    fn test_locate_rejects_non_plain_names() {
        let store = AttachmentStore::new("/data/att");
        let id = AccountId::parse("12").unwrap();
        assert_eq!(
            store.locate(&id, "a_T.png").unwrap(),
            PathBuf::from("/data/att/12/a_T.png")
        );
        for bad in ["../13/a.png", ".a_T.png.json", "", "x/y"] {
            assert!(matches!(
                store.locate(&id, bad),
                Err(StoreError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_build_reference_falls_back_without_metadata() {
        let id = AccountId::from(1u64);
        let now = Utc::now();
        let r = build_reference(&id, "a_T.png".into(), PathBuf::from("/r/1/a_T.png"), 3, now, None);
        assert_eq!(r.original_name, "a_T.png");
        assert_eq!(r.saved_at, now);
        assert!(r.kind.is_none());
    }

    #[test]
    fn test_from_config_uses_explicit_root() {
        let storage = StorageConfig {
            root: Some(PathBuf::from("/srv/receipts")),
            max_attachment_size: 10,
            sync_writes: false,
        };
        let store = AttachmentStore::from_config(&storage);
        assert_eq!(store.root(), Path::new("/srv/receipts"));
        assert_eq!(store.max_attachment_size, 10);
        assert!(!store.sync_writes);
    }
}
