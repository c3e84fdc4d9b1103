//! Where task snapshots come from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use habitguard_core::TaskSnapshot;

use crate::error::FetchError;

pub const ENFORCEMENT_PATH: &str = "/api/enforcement/state";

/// Blocking provider of the current task snapshot.
///
/// Called from `spawn_blocking`; implementations may block up to their own
/// timeout.
pub trait TaskSource: Send + Sync + 'static {
    fn fetch(&self) -> Result<TaskSnapshot, FetchError>;

    /// Human-readable origin used in logs and status.
    fn describe(&self) -> String;
}

/// Fetches the snapshot from the habit API over HTTP.
pub struct HttpTaskSource {
    agent: ureq::Agent,
    url: String,
}

impl HttpTaskSource {
    pub fn new(api_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            agent,
            url: enforcement_url(api_url),
        }
    }
}

pub fn enforcement_url(api_url: &str) -> String {
    format!("{}{ENFORCEMENT_PATH}", api_url.trim_end_matches('/'))
}

impl TaskSource for HttpTaskSource {
    fn fetch(&self) -> Result<TaskSnapshot, FetchError> {
        let response = self
            .agent
            .get(&self.url)
            .set("Accept", "application/json")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => FetchError::Status {
                    url: self.url.clone(),
                    status,
                },
                ureq::Error::Transport(transport) => FetchError::Unreachable {
                    url: self.url.clone(),
                    message: transport.to_string(),
                },
            })?;

        response
            .into_json::<TaskSnapshot>()
            .map_err(|err| FetchError::Decode {
                url: self.url.clone(),
                message: err.to_string(),
            })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the snapshot from a JSON file on disk, in the same shape the API
/// serves. Used for offline operation and local testing.
pub struct FileTaskSource {
    path: PathBuf,
}

impl FileTaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for FileTaskSource {
    fn fetch(&self) -> Result<TaskSnapshot, FetchError> {
        let url = self.describe();
        let contents = std::fs::read_to_string(&self.path).map_err(|err| {
            FetchError::Unreachable {
                url: url.clone(),
                message: err.to_string(),
            }
        })?;
        serde_json::from_str(&contents).map_err(|err| FetchError::Decode {
            url,
            message: err.to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
