//! Which filesystem events count as an edit-save, and when to act on them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::EventKind;
use tokio::time::Instant;

use azion_core::TrackedField;

/// Quiet period after the last event for a path before it is pushed.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub(crate) fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// `<root>/<function-dir>/<tracked file>`, exactly one level deep.
pub fn is_tracked_edit(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    let mut components = relative.components();
    let (Some(_dir), Some(file), None) = (
        components.next(),
        components.next(),
        components.next(),
    ) else {
        return false;
    };
    file.as_os_str()
        .to_str()
        .and_then(TrackedField::from_file_name)
        .is_some()
}

/// Trailing-edge debounce: a path becomes due once no event has touched it
/// for the configured window, so the push reads the final saved content.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Record an event; pushes the path's deadline out by one window.
    pub fn note(&mut self, path: &Path, now: Instant) {
        self.pending.insert(path.to_path_buf(), now + self.window);
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every path whose deadline has passed, sorted.
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            self.pending.remove(path);
        }
        due.sort();
        due
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
