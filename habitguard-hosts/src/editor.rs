//! [`HostsEditor`]: the only code path that mutates the hosts file.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::backup::BackupStore;
use crate::block::{self, BlockScan};
use crate::error::{io_err, HostsError};
use crate::writer::{atomic_write, WriteOutcome};

/// Reads, backs up and rewrites the managed block of a hosts file.
///
/// One editor instance corresponds to one daemon session: the first mutation
/// it performs is preceded by a backup.
#[derive(Debug)]
pub struct HostsEditor {
    hosts_path: PathBuf,
    backups: BackupStore,
    backed_up_this_session: bool,
}

impl HostsEditor {
    pub fn new(hosts_path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            hosts_path: hosts_path.into(),
            backups: BackupStore::new(backup_dir),
            backed_up_this_session: false,
        }
    }

    pub fn hosts_path(&self) -> &Path {
        &self.hosts_path
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Current file content as raw bytes; a missing file reads as empty.
    pub fn read_content(&self) -> Result<Vec<u8>, HostsError> {
        match std::fs::read(&self.hosts_path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(io_err(&self.hosts_path, err)),
        }
    }

    /// Domains currently inside the managed block.
    ///
    /// Missing markers are a valid "nothing blocked" state.
    pub fn read_managed_block(&self) -> Result<BTreeSet<String>, HostsError> {
        let content = self.read_content()?;
        if let BlockScan::Malformed { reason } = block::scan(&content) {
            tracing::warn!(
                "malformed managed block in {} ({reason}); treating as absent",
                self.hosts_path.display()
            );
        }
        Ok(block::parse_domains(&content))
    }

    /// Replace the managed block with `domains`; an empty set removes it.
    pub fn write(&mut self, domains: &BTreeSet<String>) -> Result<WriteOutcome, HostsError> {
        let current = self.read_content()?;
        if let BlockScan::Malformed { reason } = block::scan(&current) {
            tracing::warn!(
                "malformed managed block in {} ({reason}); rewriting cleanly",
                self.hosts_path.display()
            );
        }
        let rendered = block::splice(&current, domains);
        self.commit(&current, &rendered)
    }

    /// Strip the managed block unconditionally, including stray markers.
    pub fn restore(&mut self) -> Result<WriteOutcome, HostsError> {
        let current = self.read_content()?;
        let stripped = block::strip(&current);
        self.commit(&current, &stripped)
    }

    /// Replace the hosts file with the newest backup, minus any managed block.
    ///
    /// Snapshots may have been taken while blocking was in effect, so the
    /// block is stripped from the restored content. No snapshot of the file
    /// being replaced is taken, which keeps repeated restores on the same
    /// backup.
    pub fn restore_from_backup(&mut self) -> Result<PathBuf, HostsError> {
        let latest = self.backups.latest()?.ok_or_else(|| HostsError::NoBackup {
            dir: self.backups.dir().to_path_buf(),
        })?;
        let snapshot = std::fs::read(&latest).map_err(|e| io_err(&latest, e))?;
        let content = block::strip(&snapshot);
        if self.read_content()? != content {
            atomic_write(&self.hosts_path, &content)?;
        }
        tracing::info!(
            "restored {} from {}",
            self.hosts_path.display(),
            latest.display()
        );
        Ok(latest)
    }

    /// Snapshot the hosts file before the first mutation of the session.
    ///
    /// Also snapshots when no backup exists yet for the current UTC date.
    /// Returns the new snapshot path, or `None` when nothing was taken.
    pub fn backup(&mut self) -> Result<Option<PathBuf>, HostsError> {
        let now = Utc::now();
        if self.backed_up_this_session && self.backups.has_backup_for(now.date_naive())? {
            return Ok(None);
        }

        let content = match std::fs::read(&self.hosts_path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    "{} does not exist yet; nothing to back up",
                    self.hosts_path.display()
                );
                return Ok(None);
            }
            Err(err) => return Err(io_err(&self.hosts_path, err)),
        };

        if let BlockScan::Malformed { reason } = block::scan(&content) {
            tracing::warn!(
                "mismatched markers in {} ({reason}); another process may be mid-edit",
                self.hosts_path.display()
            );
        }

        let path = self.backups.create(&content, now)?;
        self.backed_up_this_session = true;
        tracing::info!("backed up {} to {}", self.hosts_path.display(), path.display());
        Ok(Some(path))
    }

    /// Unified diff of what `write(domains)` would change, if anything.
    ///
    /// Bytes that are not valid UTF-8 show as replacement characters.
    pub fn preview(&self, domains: &BTreeSet<String>) -> Result<Option<String>, HostsError> {
        let current = self.read_content()?;
        let rendered = block::splice(&current, domains);
        if rendered == current {
            return Ok(None);
        }
        let label = self.hosts_path.display().to_string();
        Ok(crate::diff::unified(
            &String::from_utf8_lossy(&current),
            &String::from_utf8_lossy(&rendered),
            label.trim_start_matches('/'),
        ))
    }

    fn commit(&mut self, current: &[u8], next: &[u8]) -> Result<WriteOutcome, HostsError> {
        if current == next {
            return Ok(WriteOutcome::Unchanged {
                path: self.hosts_path.clone(),
            });
        }
        self.backup()?;
        atomic_write(&self.hosts_path, next)?;
        Ok(WriteOutcome::Written {
            path: self.hosts_path.clone(),
        })
    }
}
