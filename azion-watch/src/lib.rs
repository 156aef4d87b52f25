//! Edit-save driver: watch the workspace and push saved files.
//!
//! A notify watcher feeds debounced paths to a single processor task that
//! owns the sync session, so reconciliations never overlap.

mod error;
pub mod paths;
mod runtime;

pub use error::WatchError;
pub use runtime::{init_tracing, run, start_blocking};
