//! `azion watch`: push every saved tracked file until ctrl-c.

use anyhow::{Context, Result};
use clap::Args;

use crate::app;

#[derive(Args, Debug)]
pub struct WatchArgs {}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let mut session = app::open()?;
        if session.cache().is_empty() {
            println!("The local cache is empty; run `azion init` first.");
        }
        session.authenticate().map_err(app::explain)?;
        println!("Watching {} (ctrl-c to stop)", session.root().display());
        azion_watch::start_blocking(session).context("watcher exited with error")
    }
}
