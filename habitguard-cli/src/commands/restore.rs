//! `habitguard restore`: offline cleanup of the hosts file.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use habitguard_daemon::{paths::socket_path, request_ping};
use habitguard_hosts::WriteOutcome;

/// Arguments for `habitguard restore`.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Replace the hosts file with the newest backup instead of stripping
    /// the managed block.
    #[arg(long)]
    pub from_backup: bool,
}

impl RestoreArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let mut editor = super::hosts_editor(&home, &config);

        if request_ping(&socket_path(&home, &config), Duration::from_millis(500)).is_ok() {
            eprintln!(
                "warning: the daemon is running and will re-apply blocking; \
                 use `habitguard daemon reset` instead"
            );
        }

        if self.from_backup {
            let used = editor
                .restore_from_backup()
                .context("failed to restore hosts file from backup")?;
            println!(
                "restored {} from {}",
                config.hosts_path.display(),
                used.display()
            );
            return Ok(());
        }

        match editor
            .restore()
            .with_context(|| format!("failed to restore {}", config.hosts_path.display()))?
        {
            WriteOutcome::Written { path } => {
                println!("removed managed block from {}", path.display())
            }
            WriteOutcome::Unchanged { path } => {
                println!("no managed block in {}", path.display())
            }
        }
        Ok(())
    }
}
