//! Delete queue
//!
//! Sidecar files whose content has been folded into an entry are not removed while
//! the tree is being built. Their paths accumulate here and are removed in one pass
//! after the output has been persisted, so an interrupted run never loses a sidecar
//! whose content was not yet written out.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct QueueState {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

/// Append-only list of sidecar paths pending removal.
///
/// Appends are synchronized so subtrees may share one queue across threads.
#[derive(Debug, Default)]
pub struct DeleteQueue {
    state: Mutex<QueueState>,
}

/// Outcome of draining a [`DeleteQueue`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    pub removed: Vec<PathBuf>,
    /// Already gone before the drain; not an error.
    pub missing: Vec<PathBuf>,
    /// Rewritten by the output sink during the run, so left in place.
    pub kept: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl DeleteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a path. A path queued twice is kept once, at its first position.
    pub fn push(&self, path: &Path) {
        let mut state = self.state.lock();
        if state.seen.insert(path.to_path_buf()) {
            state.order.push(path.to_path_buf());
            debug!(path = %path.display(), "Queued sidecar for removal");
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().order.is_empty()
    }

    /// Copy of the pending paths in insertion order.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.state.lock().order.clone()
    }

    /// Remove every queued file. Consumes the queue so it can only be drained once.
    pub fn drain(self) -> DrainReport {
        self.drain_except(&HashSet::new())
    }

    /// Like [`drain`](Self::drain), but leaves the paths in `keep` untouched.
    pub fn drain_except(self, keep: &HashSet<PathBuf>) -> DrainReport {
        let state = self.state.into_inner();
        let mut report = DrainReport::default();
        for path in state.order {
            if keep.contains(&path) {
                report.kept.push(path);
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) if e.kind() == ErrorKind::NotFound => report.missing.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove sidecar");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        info!(
            removed = report.removed.len(),
            missing = report.missing.len(),
            kept = report.kept.len(),
            failed = report.failed.len(),
            "Delete queue drained"
        );
        report
    }
}
