//! `azion token`: manage the single stored access token.

use anyhow::Result;
use clap::Subcommand;

use crate::app;

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Delete the stored token and ask for a new one.
    Update,
}

pub fn run(command: TokenCommand) -> Result<()> {
    match command {
        TokenCommand::Update => {
            let mut gate = app::credential_gate()?;
            gate.rotate().map_err(app::explain)?;
            println!("✓ Token updated");
        }
    }
    Ok(())
}
