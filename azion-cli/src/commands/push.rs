//! `azion push <file>`: reconcile one edited file with the API.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use azion_sync::{NoOpReason, ReconcileOutcome};

use crate::app;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Path to a function's `code.<ext>` or `args.json`.
    pub file: PathBuf,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        let mut session = app::open()?;
        session.authenticate().map_err(app::explain)?;
        let outcome = app::with_spinner("Updating edge function...", || {
            session.push(&self.file)
        })
        .map_err(app::explain)?;

        match outcome {
            ReconcileOutcome::Committed { id, name, field } => {
                println!("✓ Edge function '{name}' ({id}) updated: {field}");
            }
            ReconcileOutcome::NoOp {
                reason: NoOpReason::Unchanged,
            } => println!("No changes to push for {}", self.file.display()),
            ReconcileOutcome::NoOp {
                reason: NoOpReason::Untracked,
            } => println!(
                "{} is not a code or args file; nothing pushed",
                self.file.display()
            ),
        }
        Ok(())
    }
}
