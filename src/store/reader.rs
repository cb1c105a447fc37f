//! Listing an account's attachments and reading them back as payloads.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::{build_reference, modified_time, naming, sidecar, AttachmentStore};
use crate::error::{Result, StoreError};
use crate::mime;
use crate::model::{AccountId, AttachmentRef, Payload};

impl AttachmentStore {
    /// References to every regular file directly inside the account directory,
    /// sorted by stored name, with the metadata recorded at save time.
    ///
    /// A missing account directory yields an empty list. Hidden entries
    /// (in-flight writes, metadata sidecars), subdirectories and other non-regular files are
    /// skipped. A save running concurrently may or may not be included.
    pub fn list_by_account(&self, account: &AccountId) -> Result<Vec<AttachmentRef>> {
        let dir = self.account_dir(account);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(account = %account, "No attachment directory yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::unavailable(&dir, e)),
        };

        let mut refs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::unavailable(&dir, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 filename");
                continue;
            };
            if !naming::is_plain_component(&name) {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                // Removed between readdir and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::unavailable(entry.path(), e)),
            };
            if !meta.is_file() {
                continue;
            }
            let stored = sidecar::read(&dir, &name);
            refs.push(build_reference(
                account,
                name,
                entry.path(),
                meta.len(),
                modified_time(&meta),
                stored,
            ));
        }

        refs.sort_by(|a, b| a.stored_name.cmp(&b.stored_name));
        debug!(account = %account, count = refs.len(), "Listed attachments");
        Ok(refs)
    }

    /// Load an attachment and encode it as a MIME-typed base64 payload.
    ///
    /// The file is located from the reference's account and stored name; a
    /// reference whose `path` does not match that location is rejected with
    /// `InvalidInput`. Fails with `NotFound` if the file was removed since
    /// the reference was produced.
    pub fn read_as_payload(&self, reference: &AttachmentRef) -> Result<Payload> {
        let path = self.locate(&reference.account_id, &reference.stored_name)?;
        if path != reference.path {
            return Err(StoreError::invalid(format!(
                "reference path {} does not match stored attachment {}",
                reference.path.display(),
                path.display()
            )));
        }
        read_payload(&path)
    }

    /// Rebuild the reference of a stored file from its account and stored name.
    pub fn resolve(&self, account: &AccountId, stored_name: &str) -> Result<AttachmentRef> {
        let path = self.locate(account, stored_name)?;
        let meta = std::fs::metadata(&path).map_err(|e| StoreError::read(&path, e))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(path));
        }
        let stored = sidecar::read(&self.account_dir(account), stored_name);
        Ok(build_reference(
            account,
            stored_name.to_string(),
            path,
            meta.len(),
            modified_time(&meta),
            stored,
        ))
    }
}

/// Read the file at `path` into a [`Payload`], typing it by extension.
///
/// This is an all-at-once read; attachments are bounded by the store's size
/// limit on the way in.
pub fn read_payload(path: &Path) -> Result<Payload> {
    let meta = std::fs::metadata(path).map_err(|e| StoreError::read(path, e))?;
    if !meta.is_file() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| StoreError::read(path, e))?;
    let mime_type = mime::mime_for_path(path);
    debug!(path = %path.display(), mime = mime_type, size = bytes.len(), "Read attachment");
    Ok(Payload::encode(mime_type, &bytes))
}
