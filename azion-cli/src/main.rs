//! Azion edge functions: local workspace mirror CLI.
//!
//! # Usage
//!
//! ```text
//! azion init [--dry-run]
//! azion token update
//! azion push <file>
//! azion create <name> --language javascript|lua --code <file> [--args <file>] [--inactive]
//! azion status [--json]
//! azion diff [<name>]
//! azion watch
//! azion config show
//! azion config set <key> <value>
//! ```

mod app;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, create::CreateArgs, diff::DiffArgs, init::InitArgs, push::PushArgs,
    status::StatusArgs, token::TokenCommand, watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "azion",
    version,
    about = "Mirror Azion edge functions into a local workspace and push edits back",
    long_about = None,
)]
struct Cli {
    /// Log library activity to stdout (`RUST_LOG` refines the filter).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch every edge function and write the local workspace.
    Init(InitArgs),

    /// Manage the stored access token.
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },

    /// Push one edited code or args file to the API.
    Push(PushArgs),

    /// Create a new edge function and add it to the workspace.
    Create(CreateArgs),

    /// Compare the workspace with the last fetched snapshot.
    Status(StatusArgs),

    /// Show unified diffs of local edits against the snapshot.
    Diff(DiffArgs),

    /// Push every saved code or args file until interrupted.
    Watch(WatchArgs),

    /// Show or change settings in ~/.azion/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        azion_watch::init_tracing();
    }
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Token { command } => commands::token::run(command),
        Commands::Push(args) => args.run(),
        Commands::Create(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Watch(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
