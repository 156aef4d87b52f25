//! `azion create <name> --language <lang> --code <file> [--args <file>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use azion_core::{Language, NewEdgeFunction};

use crate::app;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the new edge function.
    pub name: String,

    /// Runtime language: javascript | lua.
    #[arg(long, short = 'l', default_value = "javascript")]
    pub language: String,

    /// File holding the function code.
    #[arg(long)]
    pub code: PathBuf,

    /// JSON file holding the function arguments (defaults to `{}`).
    #[arg(long)]
    pub args: Option<PathBuf>,

    /// Create the function inactive.
    #[arg(long)]
    pub inactive: bool,
}

impl CreateArgs {
    pub fn run(self) -> Result<()> {
        let code = std::fs::read_to_string(&self.code)
            .with_context(|| format!("cannot read '{}'", self.code.display()))?;
        let json_args = match &self.args {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read '{}'", path.display()))?;
                serde_json::from_str::<Value>(&raw)
                    .with_context(|| format!("'{}' is not valid JSON", path.display()))?
            }
            None => Value::Object(Default::default()),
        };

        let function = NewEdgeFunction {
            name: self.name,
            language: Language::from(self.language),
            code,
            json_args,
            active: !self.inactive,
        };

        let mut session = app::open()?;
        session.authenticate().map_err(app::explain)?;
        let (record, writes) = app::with_spinner("Creating edge function...", || {
            session.create(&function)
        })
        .map_err(app::explain)?;

        println!("✓ Created '{}' ({})", record.name, record.id);
        for write in writes {
            println!("  ✎  {}", write.path().display());
        }
        Ok(())
    }
}
