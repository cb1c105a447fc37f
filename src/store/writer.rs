//! Saving attachments: validate, name, write to a temp file, publish atomically.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use super::{build_reference, naming, sidecar, AttachmentStore, TEMP_PREFIX};
use crate::error::{Result, StoreError};
use crate::mime;
use crate::model::{AccountId, AttachmentMeta, AttachmentRef, SaveOptions};

/// How many fresh tokens to try if the target name is already taken.
const MAX_PERSIST_ATTEMPTS: usize = 8;

impl AttachmentStore {
    /// Persist `buffer` as a new attachment of `options.account_id`.
    ///
    /// 1. Validate the buffer (non-empty, within the size limit).
    /// 2. Create the account directory if needed.
    /// 3. Write the bytes to a hidden temp file in that directory.
    /// 4. Publish the metadata sidecar, then move the temp file to
    ///    `<base>_<token>.<ext>` with a no-clobber rename, drawing a new
    ///    token if either name is taken.
    ///
    /// Either the complete file is visible at the returned path or nothing
    /// is: the temp file and any unpaired sidecar are removed on every
    /// failure path.
    pub fn save(&self, buffer: &[u8], options: &SaveOptions) -> Result<AttachmentRef> {
        self.save_with_tokens(buffer, options, naming::next_token)
    }

    pub(crate) fn save_with_tokens(
        &self,
        buffer: &[u8],
        options: &SaveOptions,
        mut next_token: impl FnMut() -> String,
    ) -> Result<AttachmentRef> {
        if buffer.is_empty() {
            return Err(StoreError::invalid("attachment buffer is empty"));
        }
        if buffer.len() as u64 > self.max_attachment_size {
            return Err(StoreError::invalid(format!(
                "attachment of {} bytes exceeds the {} byte limit",
                buffer.len(),
                self.max_attachment_size
            )));
        }

        let account = &options.account_id;
        let dir = self.ensure_account_dir(account)?;

        let mut name = naming::sanitize_original_name(&options.original_name);
        if name.extension.is_empty() {
            if let Some(ext) = options
                .declared_type
                .as_deref()
                .and_then(mime::extension_for_mime)
            {
                name.extension = ext.to_string();
            }
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)
            .map_err(|e| StoreError::unavailable(&dir, e))?;

        tmp.write_all(buffer)
            .map_err(|e| StoreError::write(tmp.path(), e))?;
        tmp.flush().map_err(|e| StoreError::write(tmp.path(), e))?;
        if self.sync_writes {
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::write(tmp.path(), e))?;
        }

        let meta = AttachmentMeta::from_options(options, Utc::now());

        let mut attempt = 1;
        let (stored_name, path) = loop {
            let stored_name = naming::stored_name(&name, &next_token());
            let target = dir.join(&stored_name);

            let sidecar_path = match sidecar::write(&dir, &stored_name, &meta, self.sync_writes) {
                Ok(p) => p,
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_PERSIST_ATTEMPTS => {
                    debug!(path = %target.display(), attempt, "Metadata name taken, retrying");
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(StoreError::write(target, e)),
            };

            match tmp.persist_noclobber(&target) {
                Ok(_) => break (stored_name, target),
                Err(e) => {
                    sidecar::discard(&sidecar_path);
                    if e.error.kind() == ErrorKind::AlreadyExists && attempt < MAX_PERSIST_ATTEMPTS {
                        debug!(path = %target.display(), attempt, "Stored name taken, retrying");
                        tmp = e.file;
                        attempt += 1;
                    } else {
                        // Dropping `e.file` removes the temp file.
                        return Err(StoreError::write(target, e.error));
                    }
                }
            }
        };

        if self.sync_writes {
            sync_dir(&dir);
        }

        // The file is published; nothing after this point may fail.
        let saved_at = meta.saved_at;
        let reference = build_reference(
            account,
            stored_name,
            path,
            buffer.len() as u64,
            saved_at,
            Some(meta),
        );

        info!(
            account = %account,
            name = %reference.stored_name,
            size = reference.size,
            "Saved attachment"
        );
        Ok(reference)
    }

    /// Create the account directory if it does not exist. Idempotent.
    fn ensure_account_dir(&self, account: &AccountId) -> Result<PathBuf> {
        let dir = self.account_dir(account);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::unavailable(&dir, e))?;
        Ok(dir)
    }
}

/// Flush the directory entry for a freshly renamed file.
///
/// The attachment is already published at this point, so a failure only
/// weakens durability and is logged rather than returned.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!(path = %dir.display(), error = %e, "Failed to sync attachment directory");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttachmentKind;

    fn store() -> (tempfile::TempDir, AttachmentStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(tmp.path().join("attachments"));
        (tmp, store)
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_save_writes_exact_bytes() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "receipt.PDF");
        let r = store.save(b"%PDF-1.4 hello", &opts).unwrap();

        assert_eq!(std::fs::read(&r.path).unwrap(), b"%PDF-1.4 hello");
        assert_eq!(r.size, 14);
        assert!(r.stored_name.starts_with("receipt_"));
        assert!(r.stored_name.ends_with(".pdf"));
        assert_eq!(r.path.parent().unwrap(), store.account_dir(&r.account_id));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        store.save(b"x", &opts).unwrap();
        store.save(b"y", &opts).unwrap();

        let names = dir_entries(&store.account_dir(&opts.account_id));
        // Two attachments, two sidecars.
        assert_eq!(names.len(), 4);
        assert!(names.iter().all(|n| !n.starts_with(TEMP_PREFIX)));
        assert_eq!(names.iter().filter(|n| n.ends_with(".png.json")).count(), 2);
    }

    #[test]
    fn test_save_records_metadata() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "Factura luz/marzo 2024.pdf")
            .with_kind(AttachmentKind::Invoice)
            .with_info("electricity");
        let r = store.save(b"%PDF", &opts).unwrap();
        assert_eq!(r.original_name, "Factura luz/marzo 2024.pdf");
        assert_eq!(r.kind, Some(AttachmentKind::Invoice));
        assert_eq!(r.info.as_deref(), Some("electricity"));

        let meta = sidecar::read(&store.account_dir(&r.account_id), &r.stored_name).unwrap();
        assert_eq!(meta.original_name, r.original_name);
        assert_eq!(meta.saved_at, r.saved_at);
    }

    #[test]
    fn test_taken_name_retries_with_fresh_token() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        let dir = store.account_dir(&opts.account_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a_T1.png"), b"existing").unwrap();

        let mut tokens = ["T1", "T2"].into_iter().map(String::from);
        let r = store
            .save_with_tokens(b"new", &opts, || tokens.next().unwrap())
            .unwrap();

        assert_eq!(r.stored_name, "a_T2.png");
        assert_eq!(std::fs::read(dir.join("a_T1.png")).unwrap(), b"existing");
        assert_eq!(std::fs::read(dir.join("a_T2.png")).unwrap(), b"new");
        assert_eq!(
            dir_entries(&dir),
            vec![".a_T2.png.json", "a_T1.png", "a_T2.png"]
        );
    }

    #[test]
    fn test_taken_sidecar_name_retries_with_fresh_token() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        let dir = store.account_dir(&opts.account_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(".a_T1.png.json"), b"{}").unwrap();

        let mut tokens = ["T1", "T2"].into_iter().map(String::from);
        let r = store
            .save_with_tokens(b"new", &opts, || tokens.next().unwrap())
            .unwrap();
        assert_eq!(r.stored_name, "a_T2.png");
        assert!(!dir.join("a_T1.png").exists());
    }

    #[test]
    fn test_persistent_collision_fails_cleanly() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        let dir = store.account_dir(&opts.account_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a_T1.png"), b"existing").unwrap();

        let mut calls = 0;
        let err = store
            .save_with_tokens(b"new", &opts, || {
                calls += 1;
                "T1".to_string()
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::WriteFailed { .. }));
        assert_eq!(calls, MAX_PERSIST_ATTEMPTS);
        // No temp file, no orphaned sidecar, existing file untouched.
        assert_eq!(dir_entries(&dir), vec!["a_T1.png"]);
        assert_eq!(std::fs::read(dir.join("a_T1.png")).unwrap(), b"existing");
    }

    #[test]
    fn test_save_rejects_empty_buffer() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        let err = store.save(b"", &opts).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
        assert!(!store.account_dir(&opts.account_id).exists());
    }

    #[test]
    fn test_save_rejects_oversized_buffer() {
        let (_tmp, store) = store();
        let store = store.with_max_attachment_size(4);
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        assert!(store.save(b"12345", &opts).is_err());
        assert!(store.save(b"1234", &opts).is_ok());
    }

    #[test]
    fn test_save_traversal_name_stays_in_account_dir() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(5u64), "../../../evil.png");
        let r = store.save(b"x", &opts).unwrap();
        assert_eq!(r.path.parent().unwrap(), store.account_dir(&r.account_id));
        assert!(r.stored_name.starts_with("evil_"));
    }

    #[test]
    fn test_empty_name_is_synthesized() {
        let (_tmp, store) = store();
        let opts = SaveOptions::new(AccountId::from(1u64), "");
        let r = store.save(b"x", &opts).unwrap();
        assert!(r.stored_name.starts_with(naming::DEFAULT_BASE));
        assert_eq!(r.extension(), "");
    }

    #[test]
    fn test_declared_type_supplies_missing_extension() {
        let (_tmp, store) = store();
        let opts =
            SaveOptions::new(AccountId::from(1u64), "scan").with_declared_type("image/jpeg");
        let r = store.save(b"x", &opts).unwrap();
        assert_eq!(r.extension(), "jpg");

        // An explicit extension wins over the declared type.
        let opts =
            SaveOptions::new(AccountId::from(1u64), "scan.png").with_declared_type("image/jpeg");
        let r = store.save(b"x", &opts).unwrap();
        assert_eq!(r.extension(), "png");
    }

    #[test]
    fn test_root_that_is_a_file_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("not-a-dir");
        std::fs::write(&root, b"file").unwrap();
        let store = AttachmentStore::new(&root);
        let opts = SaveOptions::new(AccountId::from(1u64), "a.png");
        let err = store.save(b"x", &opts).unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable { .. }));
    }
}
