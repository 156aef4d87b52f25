//! Azion core library: domain types, path codec, settings, credentials, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and the edge function record
//! - [`naming`]: reversible function-name ⇄ directory-name codec
//! - [`config`]: `~/.azion/config.yaml` load / save
//! - [`credentials`]: the single stored access token
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod credentials;
pub mod error;
pub mod naming;
mod storage;
pub mod types;

pub use config::Settings;
pub use credentials::{FileSecretStore, MemorySecretStore, SecretStore, Token};
pub use error::CoreError;
pub use naming::{decode_name, encode_name};
pub use types::{
    EdgeFunctionRecord, FieldPatch, FunctionId, Language, NewEdgeFunction, TrackedField,
};
