//! # habitguard-hosts
//!
//! Safe editing of the system hosts file.
//!
//! [`HostsEditor`] splices a marker-delimited managed block into the file with
//! atomic temp-file-and-rename writes, snapshots the file into a
//! [`BackupStore`] before the first mutation of a session, and strips the
//! block on demand. Content outside the markers is never touched.

pub mod backup;
pub mod block;
pub mod diff;
pub mod editor;
pub mod error;
pub mod writer;

pub use backup::BackupStore;
pub use block::{BlockScan, BEGIN_MARKER, END_MARKER, LOOPBACK};
pub use editor::HostsEditor;
pub use error::HostsError;
pub use writer::WriteOutcome;
