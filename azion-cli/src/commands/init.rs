//! `azion init [--dry-run]`: fetch every edge function into the workspace.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use azion_sync::{SyncReport, WriteResult};

use crate::app;

/// Fetch the full remote listing and materialize it.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Show what would be written without touching the workspace or cache.
    #[arg(long)]
    pub dry_run: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let mut session = app::open()?;
        session.authenticate().map_err(app::explain)?;

        let report = app::with_spinner("Fetching edge functions...", || {
            session.sync(self.dry_run)
        })
        .map_err(app::explain)?;

        print_report(&report, self.dry_run);
        if !report.materialized.is_complete() {
            bail!(
                "{} edge function(s) could not be written",
                report.materialized.failures.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}✓ {} edge function(s) listed, {} file(s) written to {}",
        report.listed,
        report.materialized.written(),
        report.root.display()
    );

    for function in &report.materialized.functions {
        for write in &function.writes {
            match write {
                WriteResult::Written { path } => println!("  ✎  {}", path.display()),
                WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
                WriteResult::Unchanged { .. } => {}
            }
        }
    }

    for failure in &report.materialized.failures {
        println!(
            "  {}  {} ({}): {}",
            "✗".red().bold(),
            failure.name,
            failure.id,
            failure.error
        );
    }
}
