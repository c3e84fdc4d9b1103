//! Atomic file replacement.
//!
//! ## `atomic_write` protocol
//!
//! 1. Content is fully rendered by the caller.
//! 2. Write to `.<name>.habitguard.tmp` in the target's own directory.
//! 3. Copy the target's permission bits onto the temp file.
//! 4. Rename over the target (atomic on POSIX, same filesystem).
//! 5. On any failure the temp file is removed and the target is untouched.

use std::path::{Path, PathBuf};

use crate::error::{io_err, HostsError};

/// Outcome of a hosts file mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// File was replaced with new content.
    Written { path: PathBuf },
    /// Rendered content matched what was already on disk.
    Unchanged { path: PathBuf },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Sibling temp path used for the write-then-rename step.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hosts".to_string());
    path.with_file_name(format!(".{name}.habitguard.tmp"))
}

/// Atomically replace `path` with `content`.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), HostsError> {
    atomic_write_with_tmp(path, content, &tmp_path_for(path))
}

fn atomic_write_with_tmp(path: &Path, content: &[u8], tmp: &Path) -> Result<(), HostsError> {
    let permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(path, err)),
    };

    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Some(permissions) = permissions {
        if let Err(e) = std::fs::set_permissions(tmp, permissions) {
            let _ = std::fs::remove_file(tmp);
            return Err(io_err(tmp, e));
        }
    }

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("replaced {}", path.display());
    Ok(())
}
