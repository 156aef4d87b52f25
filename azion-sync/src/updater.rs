//! Change-detection updater: push one locally edited file back to the API.
//!
//! ```text
//! Idle -> Comparing -> NoOp
//!                   -> Pushing -> Committed
//!                              -> Failed (token rejected | other)
//! ```
//!
//! The cache is written only after the remote side has accepted the change.
//! A rejected token is invalidated and re-prompted once; the edit itself is
//! not retried and the caller sees the auth error.

use std::path::Path;

use serde_json::Value;

use azion_core::{
    decode_name, EdgeFunctionRecord, FieldPatch, FunctionId, SecretStore, TrackedField,
};

use crate::cache::LocalCache;
use crate::client::EdgeFunctionApi;
use crate::credential::{CredentialGate, TokenPrompt};
use crate::error::SyncError;

/// Why a reconciliation ended without a network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The file is not one of the two tracked files of a function.
    Untracked,
    /// The content equals the cached value.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NoOp {
        reason: NoOpReason,
    },
    Committed {
        id: FunctionId,
        name: String,
        field: TrackedField,
    },
}

impl ReconcileOutcome {
    fn noop(reason: NoOpReason) -> Self {
        ReconcileOutcome::NoOp { reason }
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

/// Build the patch for `field` if `new_content` differs from `cached`.
fn change_for(
    path: &Path,
    field: TrackedField,
    new_content: &str,
    cached: &EdgeFunctionRecord,
) -> Result<Option<FieldPatch>, SyncError> {
    match field {
        TrackedField::Code => {
            // Line-ending conversions alone are not an edit; a real edit is
            // sent exactly as saved.
            if normalize_line_endings(new_content) == normalize_line_endings(&cached.code) {
                return Ok(None);
            }
            Ok(Some(FieldPatch::Code(new_content.to_owned())))
        }
        TrackedField::JsonArgs => {
            let args: Value =
                serde_json::from_str(new_content).map_err(|source| SyncError::InvalidArgs {
                    path: path.to_path_buf(),
                    source,
                })?;
            if args == cached.json_args {
                return Ok(None);
            }
            Ok(Some(FieldPatch::JsonArgs(args)))
        }
    }
}

/// Reconcile the edited file at `path`, whose new content is `new_content`.
///
/// The logical name comes from the containing directory; the field comes
/// from the file name. Files outside the naming convention are a no-op and
/// never consult the cache.
pub fn reconcile<A, S, P>(
    path: &Path,
    new_content: &str,
    cache: &mut LocalCache,
    api: &A,
    gate: &mut CredentialGate<S, P>,
) -> Result<ReconcileOutcome, SyncError>
where
    A: EdgeFunctionApi + ?Sized,
    S: SecretStore,
    P: TokenPrompt,
{
    let Some(field) = path
        .file_name()
        .and_then(|f| f.to_str())
        .and_then(TrackedField::from_file_name)
    else {
        return Ok(ReconcileOutcome::noop(NoOpReason::Untracked));
    };

    let dir_name = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|d| d.to_str())
        .ok_or_else(|| SyncError::NotInWorkspace {
            path: path.to_path_buf(),
        })?;
    let name = decode_name(dir_name)?;

    let record = cache.lookup_by_name(&name)?;
    // `code.lua` inside a JavaScript function is not that function's code.
    let expected = field.file_name(&record.language)?;
    if path.file_name().and_then(|f| f.to_str()) != Some(expected.as_str()) {
        tracing::debug!("{} does not match {}'s language", path.display(), name);
        return Ok(ReconcileOutcome::noop(NoOpReason::Untracked));
    }

    let Some(patch) = change_for(path, field, new_content, record)? else {
        tracing::debug!("{name}: {field} unchanged");
        return Ok(ReconcileOutcome::noop(NoOpReason::Unchanged));
    };
    let id = record.id;

    let token = gate.ensure_token()?;
    tracing::info!("pushing {field} of {name} ({id})");
    match api.patch(&token, id, &patch) {
        Ok(_) => {
            cache.set_field(id, &patch);
            Ok(ReconcileOutcome::Committed { id, name, field })
        }
        Err(err) if err.is_auth() => {
            gate.invalidate()?;
            if let Err(prompt_err) = gate.ensure_token() {
                tracing::warn!("no replacement token: {prompt_err}");
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use azion_core::{EdgeFunctionRecord, Language, MemorySecretStore};
    use serde_json::json;

    use super::*;
    use crate::credential::ScriptedPrompt;
    use crate::error::ApiError;
    use crate::fake::{Call, FakeApi};

    type Gate = CredentialGate<MemorySecretStore, ScriptedPrompt>;

    fn gate_with(token: &str, answers: &[&str]) -> Gate {
        CredentialGate::new(
            MemorySecretStore::with_token(token),
            ScriptedPrompt::answering(answers),
        )
    }

    fn cache_with_x() -> LocalCache {
        let mut cache = LocalCache::new();
        let mut other = EdgeFunctionRecord::new(6, "y", Language::Lua, "keep");
        other.json_args = json!({"n": 1});
        cache.replace_all(vec![
            EdgeFunctionRecord::new(5, "x", Language::JavaScript, "old"),
            other,
        ]);
        cache
    }

    fn code_path(name: &str) -> PathBuf {
        PathBuf::from("/ws").join(name).join("code.js")
    }

    #[test]
    fn changed_code_is_patched_and_committed() {
        let mut cache = cache_with_x();
        let before = cache.clone();
        let api = FakeApi::with_patch(Ok(json!({"id": 5, "code": "new"})));
        let mut gate = gate_with("tkn", &[]);

        let outcome = reconcile(&code_path("x"), "new", &mut cache, &api, &mut gate).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Committed {
                id: FunctionId(5),
                name: "x".into(),
                field: TrackedField::Code
            }
        );
        assert_eq!(
            api.calls(),
            vec![Call::Patch {
                token: "tkn".into(),
                id: FunctionId(5),
                body: json!({"code": "new"})
            }]
        );

        let patched = cache.get(FunctionId(5)).unwrap();
        assert_eq!(patched.code, "new");
        assert_eq!(patched.name, "x");
        assert_eq!(patched.json_args, json!({}));
        assert_eq!(cache.get(FunctionId(6)), before.get(FunctionId(6)));
    }

    #[test]
    fn identical_content_makes_no_call() {
        let mut cache = cache_with_x();
        let before = cache.clone();
        let api = FakeApi::default();
        let mut gate = gate_with("tkn", &[]);

        let outcome = reconcile(&code_path("x"), "old", &mut cache, &api, &mut gate).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::NoOp {
                reason: NoOpReason::Unchanged
            }
        );
        assert!(api.calls().is_empty());
        assert_eq!(cache, before);
    }

    #[test]
    fn crlf_only_difference_is_unchanged() {
        let mut cache = LocalCache::new();
        cache.replace_all(vec![EdgeFunctionRecord::new(
            1,
            "w",
            Language::JavaScript,
            "a\nb\n",
        )]);
        let api = FakeApi::default();
        let mut gate = gate_with("tkn", &[]);
        let outcome = reconcile(&code_path("w"), "a\r\nb\r\n", &mut cache, &api, &mut gate);
        assert!(matches!(
            outcome,
            Ok(ReconcileOutcome::NoOp {
                reason: NoOpReason::Unchanged
            })
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn crlf_edit_is_pushed_and_cached_as_saved() {
        let mut cache = LocalCache::new();
        cache.replace_all(vec![EdgeFunctionRecord::new(
            1,
            "w",
            Language::JavaScript,
            "a\r\nb\r\n",
        )]);
        let api = FakeApi::with_patch(Ok(json!({})));
        let mut gate = gate_with("tkn", &[]);

        let saved = "a\r\nB\r\n";
        let outcome = reconcile(&code_path("w"), saved, &mut cache, &api, &mut gate).unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Committed { .. }));
        assert_eq!(
            api.calls(),
            vec![Call::Patch {
                token: "tkn".into(),
                id: FunctionId(1),
                body: json!({"code": saved})
            }]
        );
        assert_eq!(cache.get(FunctionId(1)).unwrap().code, saved);
    }

    #[test]
    fn invalid_token_deletes_and_reprompts_leaving_cache_untouched() {
        let mut cache = cache_with_x();
        let before = cache.clone();
        let api = FakeApi::with_patch(Err(ApiError::Auth {
            detail: Some("Invalid token".into()),
        }));
        let mut gate = gate_with("stale", &["fresh"]);

        let err = reconcile(&code_path("x"), "new", &mut cache, &api, &mut gate).unwrap_err();
        assert!(err.is_auth());
        assert_eq!(cache.get(FunctionId(5)).unwrap().code, "old");
        assert_eq!(cache, before);
        assert_eq!(gate.prompt().asked, 1, "exactly one re-prompt");
        assert_eq!(gate.store().get().unwrap().unwrap().expose(), "fresh");
        assert_eq!(api.calls().len(), 1, "the edit is not retried");
    }

    #[test]
    fn dismissed_reprompt_still_surfaces_auth_error() {
        let mut cache = cache_with_x();
        let api = FakeApi::with_patch(Err(ApiError::Auth { detail: None }));
        let mut gate = gate_with("stale", &[]);

        let err = reconcile(&code_path("x"), "new", &mut cache, &api, &mut gate).unwrap_err();
        assert!(err.is_auth());
        assert!(gate.store().get().unwrap().is_none());
    }

    #[test]
    fn error_without_results_leaves_cache_and_token() {
        let mut cache = cache_with_x();
        let before = cache.clone();
        let api = FakeApi::with_patch(Err(ApiError::UpstreamProtocol {
            status: 400,
            detail: Some("bad code".into()),
            body: r#"{"detail":"bad code"}"#.into(),
        }));
        let mut gate = gate_with("tkn", &[]);

        let err = reconcile(&code_path("x"), "new", &mut cache, &api, &mut gate).unwrap_err();
        assert!(matches!(err, SyncError::Api(ApiError::UpstreamProtocol { .. })));
        assert_eq!(cache, before);
        assert_eq!(gate.store().get().unwrap().unwrap().expose(), "tkn");
        assert_eq!(gate.prompt().asked, 0);
    }

    #[test]
    fn unknown_name_is_stale_cache() {
        let mut cache = cache_with_x();
        let api = FakeApi::default();
        let mut gate = gate_with("tkn", &[]);
        let err = reconcile(&code_path("ghost"), "x", &mut cache, &api, &mut gate).unwrap_err();
        assert!(matches!(err, SyncError::StaleCache { ref name } if name == "ghost"));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn untracked_file_never_consults_cache() {
        let mut cache = LocalCache::new();
        let api = FakeApi::default();
        let mut gate = gate_with("tkn", &[]);
        let path = PathBuf::from("/ws/ghost/README.md");
        let outcome = reconcile(&path, "notes", &mut cache, &api, &mut gate).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::NoOp {
                reason: NoOpReason::Untracked
            }
        );
    }

    #[test]
    fn wrong_language_code_file_is_untracked() {
        let mut cache = cache_with_x();
        let api = FakeApi::default();
        let mut gate = gate_with("tkn", &[]);
        let path = PathBuf::from("/ws/x/code.lua");
        let outcome = reconcile(&path, "new", &mut cache, &api, &mut gate).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::NoOp {
                reason: NoOpReason::Untracked
            }
        );
        assert!(api.calls().is_empty());
    }

    #[test]
    fn args_compare_semantically_and_patch_parsed_value() {
        let mut cache = cache_with_x();
        let api = FakeApi::with_patch(Ok(json!({})));
        let mut gate = gate_with("tkn", &[]);
        let path = PathBuf::from("/ws/y/args.json");

        let same = reconcile(&path, "{ \"n\" : 1 }\n", &mut cache, &api, &mut gate).unwrap();
        assert_eq!(
            same,
            ReconcileOutcome::NoOp {
                reason: NoOpReason::Unchanged
            }
        );

        let changed = reconcile(&path, r#"{"n": 2}"#, &mut cache, &api, &mut gate).unwrap();
        assert!(matches!(
            changed,
            ReconcileOutcome::Committed {
                field: TrackedField::JsonArgs,
                ..
            }
        ));
        assert_eq!(
            api.calls(),
            vec![Call::Patch {
                token: "tkn".into(),
                id: FunctionId(6),
                body: json!({"json_args": {"n": 2}})
            }]
        );
        let updated = cache.get(FunctionId(6)).unwrap();
        assert_eq!(updated.json_args, json!({"n": 2}));
        assert_eq!(updated.code, "keep");
    }

    #[test]
    fn invalid_args_json_makes_no_call() {
        let mut cache = cache_with_x();
        let api = FakeApi::default();
        let mut gate = gate_with("tkn", &[]);
        let err = reconcile(
            &PathBuf::from("/ws/y/args.json"),
            "{ not json",
            &mut cache,
            &api,
            &mut gate,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgs { .. }));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn encoded_directory_name_is_decoded_for_lookup() {
        let mut cache = LocalCache::new();
        cache.replace_all(vec![EdgeFunctionRecord::new(
            9,
            "team/api",
            Language::JavaScript,
            "v1",
        )]);
        let api = FakeApi::with_patch(Ok(json!({})));
        let mut gate = gate_with("tkn", &[]);
        let path = PathBuf::from("/ws/team\u{2215}api/code.js");
        let outcome = reconcile(&path, "v2", &mut cache, &api, &mut gate).unwrap();
        assert!(matches!(
            outcome,
            ReconcileOutcome::Committed { ref name, .. } if name == "team/api"
        ));
    }

    #[test]
    fn missing_token_is_prompted_before_push() {
        let mut cache = cache_with_x();
        let api = FakeApi::with_patch(Ok(json!({})));
        let mut gate = CredentialGate::new(
            MemorySecretStore::default(),
            ScriptedPrompt::answering(&["typed"]),
        );
        reconcile(&code_path("x"), "new", &mut cache, &api, &mut gate).unwrap();
        assert!(matches!(&api.calls()[0], Call::Patch { token, .. } if token == "typed"));
    }
}
