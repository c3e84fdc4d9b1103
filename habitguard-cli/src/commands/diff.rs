//! `habitguard diff`: preview the hosts file change of the next evaluation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use habitguard_core::evaluate;

/// Arguments for `habitguard diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let snapshot = super::fetch_snapshot(&config)?;

        let desired = evaluate(Utc::now(), &snapshot.tasks, &snapshot.blocked_websites);
        let editor = super::hosts_editor(&home, &config);
        let preview = editor
            .preview(&desired.blocked_domains)
            .with_context(|| format!("failed to read {}", config.hosts_path.display()))?;

        match preview {
            None => println!("No differences for {}.", config.hosts_path.display()),
            Some(diff) => {
                print!("{diff}");
                if !diff.ends_with('\n') {
                    println!();
                }
            }
        }
        Ok(())
    }
}
