//! `azion config show|set`: settings in `~/.azion/config.yaml`.

use anyhow::{Context, Result};
use clap::Subcommand;

use azion_core::config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings (file values plus environment overrides).
    Show,
    /// Change one setting: api_url, workspace_dir, max_pages, timeout_secs.
    Set { key: String, value: String },
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = config::home().context("could not determine home directory")?;
    match command {
        ConfigCommand::Show => {
            let settings = config::load_effective_at(&home).context("failed to load settings")?;
            println!("api_url: {}", settings.api_url);
            println!(
                "workspace_dir: {}",
                settings.workspace_root(&home).display()
            );
            println!("max_pages: {}", settings.max_pages);
            println!("timeout_secs: {}", settings.timeout_secs);
        }
        ConfigCommand::Set { key, value } => {
            let mut settings = config::load_at(&home).context("failed to load settings")?;
            settings.set(&key, &value)?;
            config::save_at(&home, &settings).context("failed to save settings")?;
            println!("✓ {key} = {value}");
        }
    }
    Ok(())
}
