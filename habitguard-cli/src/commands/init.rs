//! `habitguard init`: write the default config.

use anyhow::{Context, Result};
use clap::Args;

use habitguard_core::config;

/// Arguments for `habitguard init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let path = config::init_at(&home, self.force)
            .context("failed to write config (use --force to overwrite)")?;
        println!("wrote {}", path.display());
        Ok(())
    }
}
