//! # azion-sync
//!
//! Local mirror of the remote edge functions collection.
//!
//! [`Session`] ties the pieces together: the [`CredentialGate`] supplies the
//! token, [`list_all`] walks the paginated listing into the [`LocalCache`],
//! the materializer writes one directory per function, and [`reconcile`]
//! pushes a single edited file back.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod credential;
pub mod diff;
pub mod error;
#[cfg(test)]
mod fake;
pub mod materializer;
pub mod pipeline;
pub mod status;
pub mod updater;

pub use aggregator::list_all;
pub use cache::LocalCache;
pub use client::{EdgeFunctionApi, HttpClient, Page};
pub use credential::{CredentialGate, TokenPrompt};
pub use error::{ApiError, SyncError};
pub use materializer::{MaterializeReport, WriteResult};
pub use pipeline::{Session, SyncReport};
pub use status::{FunctionStatus, StatusEntry};
pub use updater::{reconcile, NoOpReason, ReconcileOutcome};
