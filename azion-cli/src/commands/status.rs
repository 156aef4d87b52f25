//! `azion status`: workspace state against the last fetched snapshot.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use azion_sync::{FunctionStatus, StatusEntry};

use crate::app;

/// Arguments for `azion status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let session = app::open()?;
        let entries = session.status().context("failed to scan the workspace")?;

        if self.json {
            let payload = serde_json::json!({
                "root": session.root(),
                "synced_at": session.cache().synced_at,
                "functions": entries,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render status JSON")?
            );
            return Ok(());
        }

        print_table(&entries, session.cache().synced_at);
        Ok(())
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "STATUS")]
    status: &'static str,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

fn print_table(entries: &[StatusEntry], synced_at: Option<DateTime<Utc>>) {
    match synced_at {
        Some(at) => println!("Last synced {}", format_age(Utc::now() - at)),
        None => {
            println!("Never synced. Run 'azion init' to fetch your edge functions.");
            if entries.is_empty() {
                return;
            }
        }
    }
    if entries.is_empty() {
        println!("No edge functions.");
        return;
    }

    let rows: Vec<StatusRow> = entries
        .iter()
        .map(|entry| StatusRow {
            indicator: status_indicator(&entry.status),
            name: entry.name.clone(),
            id: entry.id.map(|id| id.to_string()).unwrap_or_default(),
            status: status_label(&entry.status),
            detail: status_detail(&entry.status),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let modified = entries
        .iter()
        .filter(|e| matches!(e.status, FunctionStatus::Modified { .. }))
        .count();
    if modified > 0 {
        println!("Run 'azion push <file>' to send local edits.");
    }
}

fn status_label(status: &FunctionStatus) -> &'static str {
    match status {
        FunctionStatus::Current => "CURRENT",
        FunctionStatus::Modified { .. } => "MODIFIED",
        FunctionStatus::Missing => "MISSING",
        FunctionStatus::Orphan => "ORPHAN",
    }
}

fn status_indicator(status: &FunctionStatus) -> String {
    match status {
        FunctionStatus::Current => "■".green().bold().to_string(),
        FunctionStatus::Modified { .. } => "■".red().bold().to_string(),
        FunctionStatus::Missing => "■".yellow().bold().to_string(),
        FunctionStatus::Orphan => "■".magenta().bold().to_string(),
    }
}

fn status_detail(status: &FunctionStatus) -> String {
    match status {
        FunctionStatus::Current => "up to date".to_string(),
        FunctionStatus::Modified { fields } => {
            let names: Vec<String> = fields.iter().map(ToString::to_string).collect();
            format!("{} edited", names.join(", "))
        }
        FunctionStatus::Missing => "not in workspace".to_string(),
        FunctionStatus::Orphan => "no remote record".to_string(),
    }
}

fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
