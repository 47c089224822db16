//! Indexing run
//!
//! [`Indexer`] ties the pieces together for one target: resolve it, build the
//! tree into a sink, finish the sink, then (only once output is persisted) drain
//! the sidecar delete queue and apply renames.

use crate::cancel::CancellationToken;
use crate::config::{IndexerConfig, ResolvedConfig};
use crate::delete_queue::DeleteQueue;
use crate::error::RunError;
use crate::events::EventSink;
use crate::extractor::{ExifToolExtractor, ExtractorGate};
use crate::rename::{apply_renames, plan_renames};
use crate::report::RunReport;
use crate::sink::EntrySink;
use crate::timestamps::TimestampSource;
use crate::tree::{FilesystemItem, TreeBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Asked before queued sidecars are removed; `false` keeps them.
pub type DeletionPrompt = Box<dyn Fn(&[PathBuf]) -> bool>;

pub struct Indexer {
    config: ResolvedConfig,
    builder: TreeBuilder,
    confirm_deletion: Option<DeletionPrompt>,
}

impl Indexer {
    /// Validate `config` and set up an indexer for it.
    pub fn new(config: &IndexerConfig) -> Result<Self, RunError> {
        Ok(Self::from_resolved(config.validate()?))
    }

    pub fn from_resolved(config: ResolvedConfig) -> Self {
        let extractor = if config.extractor.enabled {
            ExtractorGate::new(
                Box::new(ExifToolExtractor::new(
                    config.extractor.program.clone(),
                    Duration::from_millis(config.extractor.timeout_ms),
                    &config.extractor.ignored_keys,
                )),
                &config.extractor.excluded_extensions,
            )
        } else {
            ExtractorGate::disabled()
        };

        let mut builder = TreeBuilder::new(config.engine.clone())
            .with_walker_config(config.walker.clone())
            .with_extractor(extractor);
        if let Some(classifier) = &config.sidecars {
            builder = builder.with_sidecars(classifier.clone());
        }

        Self {
            config,
            builder,
            confirm_deletion: None,
        }
    }

    /// Replace the metadata extractor.
    pub fn with_extractor(mut self, extractor: ExtractorGate) -> Self {
        self.builder = self.builder.with_extractor(extractor);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.builder = self.builder.with_events(events);
        self
    }

    pub fn with_timestamps(mut self, source: Box<dyn TimestampSource>) -> Self {
        self.builder = self.builder.with_timestamps(source);
        self
    }

    /// Ask `prompt` before removing merged sidecars. Without one, removal proceeds.
    pub fn with_deletion_prompt(mut self, prompt: DeletionPrompt) -> Self {
        self.confirm_deletion = Some(prompt);
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Resolve the user-supplied target.
    ///
    /// Only the parent is canonicalized, so a symlink target keeps its own name
    /// and is indexed as a link.
    pub fn resolve_target(path: &Path) -> Result<FilesystemItem, RunError> {
        let invalid = |reason: String| RunError::InvalidTarget {
            path: path.to_path_buf(),
            reason,
        };
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| invalid(e.to_string()))?
                .join(path)
        };
        let resolved = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => dunce::canonicalize(parent)
                .map_err(|e| invalid(e.to_string()))?
                .join(name),
            _ => dunce::canonicalize(&absolute).map_err(|e| invalid(e.to_string()))?,
        };
        FilesystemItem::resolve(&resolved).map_err(|e| invalid(e.to_string()))
    }

    /// Index `target` into `sink`.
    ///
    /// A cancelled or failed build leaves the delete queue undrained and renames
    /// unapplied.
    pub fn run(
        &self,
        target: &Path,
        sink: &mut dyn EntrySink,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        let item = Self::resolve_target(target)?;
        let started = Instant::now();
        info!(target = %item.path.display(), kind = ?item.kind, "Indexing started");

        let extractor_available = self.builder.extractor().is_available();
        let queue = DeleteQueue::new();
        let outcome = self.builder.build(&item, &queue, cancel, sink)?;
        sink.finish(&outcome.root)?;

        let queued_sidecars = queue.len();
        let mut deletion_declined = false;
        let drain = if queue.is_empty() {
            None
        } else {
            let pending = queue.snapshot();
            let approved = self
                .confirm_deletion
                .as_ref()
                .map_or(true, |confirm| confirm(&pending));
            if approved {
                let keep: HashSet<PathBuf> = sink.persisted().into_iter().collect();
                Some(queue.drain_except(&keep))
            } else {
                warn!(count = pending.len(), "Sidecar removal declined");
                deletion_declined = true;
                None
            }
        };

        let rename = self.config.rename.enabled.then(|| {
            let plans = plan_renames(&outcome.root, &item.path, self.config.output.inplace);
            apply_renames(plans, self.config.rename.dry_run)
        });

        let counts = outcome.root.counts();
        info!(
            files = counts.files,
            directories = counts.directories,
            skipped = outcome.skipped,
            duration_ms = started.elapsed().as_millis() as u64,
            "Indexing finished"
        );

        Ok(RunReport {
            target: item.path.clone(),
            root_id: outcome.root.id.clone(),
            id_algorithm: outcome.root.id_algorithm,
            counts,
            total_bytes: outcome.root.size.bytes,
            skipped: outcome.skipped,
            hidden_sidecars: outcome.hidden_sidecars,
            queued_sidecars,
            extractor_available,
            deletion_declined,
            drain,
            rename,
        })
    }
}
