//! `azion diff [<name>]`: unified diffs of local edits against the snapshot.

use anyhow::{Context, Result};
use clap::Args;

use crate::app;

/// Arguments for `azion diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Edge function name; omit to diff every function.
    pub name: Option<String>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let session = app::open()?;
        let diffs = session
            .diff(self.name.as_deref())
            .context("diff failed")?;

        if diffs.iter().all(|d| d.diffs.is_empty()) {
            match &self.name {
                Some(name) => println!("No differences for '{name}'."),
                None => println!("No differences."),
            }
            return Ok(());
        }

        for function in diffs {
            for diff in function.diffs {
                print!("{}", diff.unified_diff);
                if !diff.unified_diff.ends_with('\n') {
                    println!();
                }
            }
        }
        Ok(())
    }
}
