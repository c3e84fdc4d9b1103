//! Error types for habitguard-hosts.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while editing the hosts file or its backups.
#[derive(Debug, Error)]
pub enum HostsError {
    /// The process lacks the privileges to read or replace `path`.
    #[error("permission denied at {path}; the daemon needs elevated privileges")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `restore_from_backup` found nothing to restore.
    #[error("no backup found in {dir}")]
    NoBackup { dir: PathBuf },
}

impl HostsError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, HostsError::PermissionDenied { .. })
    }
}

/// Convenience constructor that splits permission failures from other I/O.
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HostsError {
    let path = path.into();
    if source.kind() == ErrorKind::PermissionDenied {
        HostsError::PermissionDenied { path, source }
    } else {
        HostsError::Io { path, source }
    }
}
