pub mod daemon;
pub mod diff;
pub mod init;
pub mod restore;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use habitguard_core::{config, Config, TaskSnapshot};
use habitguard_daemon::paths::backups_dir;
use habitguard_daemon::{FileTaskSource, HttpTaskSource, TaskSource};
use habitguard_hosts::HostsEditor;

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub fn load_config(home: &Path) -> Result<Config> {
    config::load_at(home).with_context(|| {
        format!(
            "failed to load config at {}",
            config::config_path_at(home).display()
        )
    })
}

/// Fetch tasks from the same source the daemon would use.
pub fn fetch_snapshot(config: &Config) -> Result<TaskSnapshot> {
    let source: Box<dyn TaskSource> = match &config.task_file {
        Some(path) => Box::new(FileTaskSource::new(path)),
        None => Box::new(HttpTaskSource::new(&config.api_url, config.fetch_timeout())),
    };
    source
        .fetch()
        .with_context(|| format!("failed to fetch tasks from {}", source.describe()))
}

pub fn hosts_editor(home: &Path, config: &Config) -> HostsEditor {
    HostsEditor::new(&config.hosts_path, backups_dir(home))
}
