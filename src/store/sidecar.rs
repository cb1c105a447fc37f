//! Metadata sidecars: `.{stored_name}.json` next to each attachment.
//!
//! A sidecar is published before its attachment, so a listed file always
//! has its metadata. Files placed in an account directory by other means
//! simply have none.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{naming, TEMP_PREFIX};
use crate::model::AttachmentMeta;

/// Write the sidecar for `stored_name` through a temp file.
///
/// Fails with `AlreadyExists` if a sidecar with that name is present.
pub(crate) fn write(
    dir: &Path,
    stored_name: &str,
    meta: &AttachmentMeta,
    sync: bool,
) -> io::Result<PathBuf> {
    let path = dir.join(naming::sidecar_name(stored_name));
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?;
    serde_json::to_writer(&mut tmp, meta)?;
    tmp.flush()?;
    if sync {
        tmp.as_file().sync_all()?;
    }
    tmp.persist_noclobber(&path).map_err(|e| e.error)?;
    Ok(path)
}

/// Read the sidecar for `stored_name`, if there is a usable one.
pub(crate) fn read(dir: &Path, stored_name: &str) -> Option<AttachmentMeta> {
    let path = dir.join(naming::sidecar_name(stored_name));
    let contents = match std::fs::read(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read attachment metadata");
            return None;
        }
    };
    match serde_json::from_slice(&contents) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed attachment metadata");
            None
        }
    }
}

/// Remove a sidecar whose attachment was not published.
pub(crate) fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove orphaned metadata");
    }
}
