//! Build events
//!
//! The builder never logs directly. Every diagnostic or warning it produces is a
//! structured [`BuildEvent`] handed to a caller-supplied [`EventSink`]; correlating
//! and rendering those events is the sink's job.

use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How much an event matters to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No effect on output.
    Diagnostic,
    /// An item or field was dropped.
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Entry filtered by a name or glob exclusion.
    Excluded,
    /// A directory entry could not be classified during listing.
    EntryDropped,
    /// Directory listing failed; the directory is left out.
    DirectoryUnreadable,
    /// Item could not be resolved or identified; it is left out.
    ItemSkipped,
    /// Symlink whose target does not exist.
    DanglingLink,
    /// Link target exists but its content could not be hashed.
    LinkTargetUnreadable,
    /// Sidecar matched more than one rule; the first one won.
    AmbiguousSidecar,
    /// Sidecar could not be read; an error record was produced instead.
    SidecarUnreadable,
    /// Sidecar whose claiming item was skipped; indexed as an ordinary item.
    SidecarReleased,
}

impl EventKind {
    pub fn severity(&self) -> Severity {
        match self {
            EventKind::Excluded
            | EventKind::DanglingLink
            | EventKind::LinkTargetUnreadable
            | EventKind::AmbiguousSidecar
            | EventKind::SidecarReleased => Severity::Diagnostic,
            EventKind::EntryDropped
            | EventKind::DirectoryUnreadable
            | EventKind::ItemSkipped
            | EventKind::SidecarUnreadable => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildEvent {
    pub kind: EventKind,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BuildEvent {
    pub fn new(kind: EventKind, path: &Path) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Receiver for build events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BuildEvent);
}

/// Forwards events to `tracing`: warnings at WARN, diagnostics at DEBUG.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: BuildEvent) {
        let detail = event.detail.as_deref().unwrap_or("");
        match event.severity() {
            Severity::Warning => warn!(
                kind = ?event.kind,
                path = %event.path.display(),
                detail,
                "Build warning"
            ),
            Severity::Diagnostic => debug!(
                kind = ?event.kind,
                path = %event.path.display(),
                detail,
                "Build diagnostic"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: BuildEvent) {
        self.events.lock().push(event);
    }
}
