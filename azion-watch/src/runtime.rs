use std::fs;
use std::path::{Path, PathBuf};

use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use azion_core::SecretStore;
use azion_sync::{EdgeFunctionApi, ReconcileOutcome, Session, SyncError, TokenPrompt};

use crate::error::{io_err, WatchError};
use crate::paths::{is_relevant_event_kind, is_tracked_edit, Debouncer, DEBOUNCE_WINDOW};

/// Start the watch runtime and block the current thread until it exits.
pub fn start_blocking<A, S, P>(session: Session<A, S, P>) -> Result<(), WatchError>
where
    A: EdgeFunctionApi + Send + 'static,
    S: SecretStore + Send + 'static,
    P: TokenPrompt + Send + 'static,
{
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(session))
}

/// Watch the workspace and push every saved tracked file until ctrl-c.
pub async fn run<A, S, P>(session: Session<A, S, P>) -> Result<(), WatchError>
where
    A: EdgeFunctionApi + Send + 'static,
    S: SecretStore + Send + 'static,
    P: TokenPrompt + Send + 'static,
{
    let root = session.root();
    fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    tracing::info!(root = %root.display(), "watching edge functions workspace");

    let (push_tx, push_rx) = mpsc::channel::<PathBuf>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = watcher_task(root, push_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = processor_task(session, push_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, stopping watcher");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(WatchError::Task(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, signal_handle);

    handle_join("watcher", watcher_result)?;
    handle_join("processor", processor_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn watcher_task(
    root: PathBuf,
    push_tx: mpsc::Sender<PathBuf>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    // Event paths arrive canonicalized on some platforms (/private/var on macOS).
    let root = fs::canonicalize(&root).unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut _watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    _watcher.watch(&root, RecursiveMode::Recursive)?;

    let mut debounce = Debouncer::new(DEBOUNCE_WINDOW);

    loop {
        let deadline = debounce.next_deadline();
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                for path in debounce.take_due(Instant::now()) {
                    push_tx
                        .send(path)
                        .await
                        .map_err(|_| WatchError::ChannelClosed("push queue"))?;
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                for path in event.paths {
                    if is_tracked_edit(&path, &root) {
                        debounce.note(&path, Instant::now());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Sole owner of the session: pushes run one at a time, in arrival order.
async fn processor_task<A, S, P>(
    session: Session<A, S, P>,
    mut push_rx: mpsc::Receiver<PathBuf>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError>
where
    A: EdgeFunctionApi + Send + 'static,
    S: SecretStore + Send + 'static,
    P: TokenPrompt + Send + 'static,
{
    let mut session = Some(session);
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_path = push_rx.recv() => {
                let Some(path) = maybe_path else { break };
                let mut current = session
                    .take()
                    .ok_or(WatchError::ChannelClosed("session"))?;
                let (returned, path, result) = tokio::task::spawn_blocking(move || {
                    let result = current.push(&path);
                    (current, path, result)
                })
                .await
                .map_err(|err| WatchError::Task(format!("push task join error: {err}")))?;
                session = Some(returned);
                log_push(&path, result);
            }
        }
    }
    Ok(())
}

fn log_push(path: &Path, result: Result<ReconcileOutcome, SyncError>) {
    match result {
        Ok(ReconcileOutcome::Committed { id, name, field }) => {
            tracing::info!(%id, name = %name, %field, "edge function updated");
        }
        Ok(ReconcileOutcome::NoOp { reason }) => {
            tracing::debug!(path = %path.display(), ?reason, "nothing to push");
        }
        Err(err) if err.is_auth() => {
            tracing::warn!(path = %path.display(), error = %err, "token rejected; save again to retry");
        }
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "push failed");
        }
    }
}

fn handle_join(
    task: &str,
    result: Result<Result<(), WatchError>, tokio::task::JoinError>,
) -> Result<(), WatchError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(WatchError::Task(format!("{task} task join failure: {err}"))),
    }
}

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
