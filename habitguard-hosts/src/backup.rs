//! Append-only store of hosts file snapshots.
//!
//! Snapshots live at `<dir>/hosts-<YYYYMMDDTHHMMSSmmm>Z[.<n>].bak`, are
//! created with `create_new` and made read-only. Nothing here ever deletes
//! or rewrites an existing snapshot; retention is an external concern.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{io_err, HostsError};

const PREFIX: &str = "hosts-";
const SUFFIX: &str = ".bak";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

/// Parsed form of a snapshot file name: timestamp stamp plus collision counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct BackupKey {
    stamp: String,
    counter: u32,
}

fn parse_name(name: &str) -> Option<BackupKey> {
    let body = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let (stamp, counter) = match body.split_once('.') {
        Some((stamp, counter)) => (stamp, counter.parse().ok()?),
        None => (body, 0),
    };
    if stamp.len() != "20260101T000000000Z".len() || !stamp.ends_with('Z') {
        return None;
    }
    Some(BackupKey {
        stamp: stamp.to_string(),
        counter,
    })
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All snapshots, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>, HostsError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(io_err(&self.dir, err)),
        };

        let mut keyed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = parse_name(&name) {
                keyed.push((key, entry.path()));
            }
        }
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, path)| path).collect())
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>, HostsError> {
        Ok(self.list()?.pop())
    }

    /// Whether a snapshot was taken on `date` (UTC).
    pub fn has_backup_for(&self, date: NaiveDate) -> Result<bool, HostsError> {
        let day = format!("{PREFIX}{}T", date.format("%Y%m%d"));
        Ok(self.list()?.iter().any(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(&day))
                .unwrap_or(false)
        }))
    }

    /// Store `content` as a new read-only snapshot stamped `at`.
    pub fn create(&self, content: &[u8], at: DateTime<Utc>) -> Result<PathBuf, HostsError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;

        let stamp = at.format(STAMP_FORMAT).to_string();
        let mut counter = 0u32;
        loop {
            let name = if counter == 0 {
                format!("{PREFIX}{stamp}{SUFFIX}")
            } else {
                format!("{PREFIX}{stamp}.{counter}{SUFFIX}")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content).map_err(|e| io_err(&path, e))?;
                    file.sync_all().map_err(|e| io_err(&path, e))?;
                    set_read_only(&path)?;
                    return Ok(path);
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => counter += 1,
                Err(err) => return Err(io_err(&path, err)),
            }
        }
    }
}

#[cfg(unix)]
fn set_read_only(path: &Path) -> Result<(), HostsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o444))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_read_only(path: &Path) -> Result<(), HostsError> {
    let mut permissions = std::fs::metadata(path)
        .map_err(|e| io_err(path, e))?
        .permissions();
    permissions.set_readonly(true);
    std::fs::set_permissions(path, permissions).map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, hour, 0, 0).unwrap()
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::new(tmp.path().join("backups"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn snapshots_are_read_only_and_never_overwritten() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::new(tmp.path().join("backups"));

        let first = store.create(b"one", at(9)).unwrap();
        let second = store.create(b"two", at(9)).unwrap();
        assert_ne!(first, second, "same stamp must get a distinct name");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert!(std::fs::metadata(&first).unwrap().permissions().readonly());
    }

    #[test]
    fn latest_orders_by_stamp_then_counter() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::new(tmp.path());

        store.create(b"late", at(15)).unwrap();
        store.create(b"early", at(8)).unwrap();
        let collided = store.create(b"late-again", at(15)).unwrap();

        assert_eq!(store.latest().unwrap(), Some(collided));
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn foreign_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        std::fs::write(tmp.path().join("hosts-garbage.bak"), "x").unwrap();
        let store = BackupStore::new(tmp.path());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn has_backup_for_matches_utc_date() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::new(tmp.path());
        let today = at(10).date_naive();
        assert!(!store.has_backup_for(today).unwrap());
        store.create(b"x", at(10)).unwrap();
        assert!(store.has_backup_for(today).unwrap());
        assert!(!store
            .has_backup_for(today.succ_opt().unwrap())
            .unwrap());
    }
}
