use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime, IPC protocol and task source.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] habitguard_core::ConfigError),

    #[error("hosts error: {0}")]
    Hosts(#[from] habitguard_hosts::HostsError),

    #[error("task source error: {0}")]
    Fetch(#[from] FetchError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },

    #[error("daemon socket already in use: {socket}")]
    SocketInUse { socket: PathBuf },
}

/// Failure to obtain a task snapshot. Always transient from the daemon's
/// point of view: the next trigger retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("task source unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("task source at {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode task snapshot from {url}: {message}")]
    Decode { url: String, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
