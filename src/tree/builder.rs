//! Entry orchestration
//!
//! [`TreeBuilder`] turns a resolved item into an [`Entry`]: identity, timestamps,
//! embedded metadata, sidecar records, and for directories the recursive build of
//! every listed child. Failures below the target are isolated: an item that cannot
//! be identified is skipped with a warning event, a missing field stays empty, and
//! the walk continues with the next sibling.

use crate::cancel::CancellationToken;
use crate::delete_queue::DeleteQueue;
use crate::error::BuildError;
use crate::events::{BuildEvent, EventKind, EventSink, TracingEventSink};
use crate::extractor::ExtractorGate;
use crate::sidecar::{ClaimPlan, Classification, CollectContext, SidecarClassifier};
use crate::sink::EntrySink;
use crate::timestamps::{FsTimestampSource, TimestampSource};
use crate::tree::hasher::IdentityEngine;
use crate::tree::node::{Entry, EntryAttributes, EntryKind, EntryName, EntrySize, LinkTarget};
use crate::tree::walker::{list_children, sibling_names, FilesystemItem, ItemKind, WalkerConfig};
use crate::types::{IdentityPrefix, IdentitySet};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub root: Entry,
    /// Items below the target that were left out.
    pub skipped: usize,
    /// Siblings folded into another entry instead of being emitted.
    pub hidden_sidecars: usize,
}

enum Outcome {
    Built(Entry),
    Skipped(String),
}

struct Pass<'a> {
    queue: &'a DeleteQueue,
    cancel: &'a CancellationToken,
    skipped: usize,
    hidden: usize,
}

pub struct TreeBuilder {
    engine: IdentityEngine,
    walker: WalkerConfig,
    sidecars: Option<SidecarClassifier>,
    extractor: ExtractorGate,
    timestamps: Box<dyn TimestampSource>,
    events: Arc<dyn EventSink>,
}

impl TreeBuilder {
    pub fn new(engine: IdentityEngine) -> Self {
        Self {
            engine,
            walker: WalkerConfig::default(),
            sidecars: None,
            extractor: ExtractorGate::disabled(),
            timestamps: Box::new(FsTimestampSource),
            events: Arc::new(TracingEventSink),
        }
    }

    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker = config;
        self
    }

    /// Enable sidecar merging with this classifier.
    pub fn with_sidecars(mut self, classifier: SidecarClassifier) -> Self {
        self.sidecars = Some(classifier);
        self
    }

    pub fn with_extractor(mut self, extractor: ExtractorGate) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_timestamps(mut self, source: Box<dyn TimestampSource>) -> Self {
        self.timestamps = source;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn engine(&self) -> &IdentityEngine {
        &self.engine
    }

    pub fn extractor(&self) -> &ExtractorGate {
        &self.extractor
    }

    /// Build the entry tree for `target`.
    ///
    /// Every completed entry is offered to `sink` before its parent. Sidecars of
    /// the target itself are always eligible for deletion; below the target only
    /// sidecars hidden from the listing are.
    pub fn build(
        &self,
        target: &FilesystemItem,
        queue: &DeleteQueue,
        cancel: &CancellationToken,
        sink: &mut dyn EntrySink,
    ) -> Result<BuildOutcome, BuildError> {
        let mut pass = Pass {
            queue,
            cancel,
            skipped: 0,
            hidden: 0,
        };
        let classifications = self.target_classifications(target);
        match self.build_item(target, &classifications, &|_: &str| true, &mut pass, sink)? {
            Outcome::Built(root) => Ok(BuildOutcome {
                root,
                skipped: pass.skipped,
                hidden_sidecars: pass.hidden,
            }),
            Outcome::Skipped(reason) => Err(BuildError::Skipped {
                path: target.path.clone(),
                reason,
            }),
        }
    }

    fn emit(&self, kind: EventKind, item: &FilesystemItem, detail: impl Into<String>) {
        self.events
            .emit(BuildEvent::new(kind, &item.path).with_detail(detail));
    }

    fn skip(&self, kind: EventKind, item: &FilesystemItem, reason: String) -> Outcome {
        self.emit(kind, item, reason.clone());
        Outcome::Skipped(reason)
    }

    fn target_classifications(&self, target: &FilesystemItem) -> Vec<Classification> {
        let Some(classifier) = &self.sidecars else {
            return Vec::new();
        };
        match sibling_names(&target.path, &self.walker.exclusions) {
            Ok(names) => classifier.classify(&target.name, &names),
            Err(e) => {
                self.emit(EventKind::DirectoryUnreadable, target, e.to_string());
                Vec::new()
            }
        }
    }

    /// Content slot for a symlink: the target's content when readable, otherwise
    /// the name identity.
    fn link_content(&self, item: &FilesystemItem, fallback: &IdentitySet) -> IdentitySet {
        match item.kind {
            ItemKind::SymlinkToFile => match self.engine.content(&item.path) {
                Ok(set) => set,
                Err(e) => {
                    self.emit(EventKind::LinkTargetUnreadable, item, e.to_string());
                    fallback.clone()
                }
            },
            ItemKind::Dangling => {
                self.emit(EventKind::DanglingLink, item, "target does not exist");
                fallback.clone()
            }
            _ => fallback.clone(),
        }
    }

    fn build_item(
        &self,
        item: &FilesystemItem,
        classifications: &[Classification],
        deletable: &dyn Fn(&str) -> bool,
        pass: &mut Pass<'_>,
        sink: &mut dyn EntrySink,
    ) -> Result<Outcome, BuildError> {
        if pass.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        let lstat = match std::fs::symlink_metadata(&item.path) {
            Ok(m) => m,
            Err(e) => return Ok(self.skip(EventKind::ItemSkipped, item, e.to_string())),
        };

        let (kind, prefix, id_source, hashes, link_target) = match item.kind {
            ItemKind::File => {
                let set = match self.engine.content(&item.path) {
                    Ok(set) => set,
                    Err(e) => {
                        return Ok(self.skip(
                            EventKind::ItemSkipped,
                            item,
                            format!("content unreadable: {}", e),
                        ))
                    }
                };
                (EntryKind::File, IdentityPrefix::File, set.clone(), Some(set), None)
            }
            ItemKind::Directory => {
                let set = self.engine.name_pair(&item.name, &item.parent_name());
                (EntryKind::Directory, IdentityPrefix::Directory, set, None, None)
            }
            ItemKind::SymlinkToFile | ItemKind::SymlinkToDirectory | ItemKind::Dangling => {
                let set = self.engine.name_pair(&item.name, &item.parent_name());
                let target = match item.kind {
                    ItemKind::SymlinkToFile => LinkTarget::File,
                    ItemKind::SymlinkToDirectory => LinkTarget::Directory,
                    _ => LinkTarget::Dangling,
                };
                let content = self.link_content(item, &set);
                (EntryKind::File, IdentityPrefix::File, set, Some(content), Some(target))
            }
        };
        let Some(id) = self.engine.identity(prefix, &id_source) else {
            return Ok(self.skip(
                EventKind::ItemSkipped,
                item,
                format!("no {} digest", self.engine.primary()),
            ));
        };

        let timestamps = self.timestamps.stat(&item.path);
        let extension = match kind {
            EntryKind::File => item.extension(),
            EntryKind::Directory => None,
        };

        let mut metadata = Vec::new();
        let mut removable = Vec::new();
        if item.kind == ItemKind::File {
            if let Some(record) = self
                .extractor
                .record(&item.path, extension.as_deref(), &self.engine)
            {
                metadata.push(record);
            }
        }
        if let (Some(classifier), Some(dir)) = (&self.sidecars, item.path.parent()) {
            if !classifications.is_empty() {
                let ctx = CollectContext {
                    timestamps: self.timestamps.as_ref(),
                    events: self.events.as_ref(),
                };
                let collected = classifier.collect(dir, classifications, &ctx, deletable);
                metadata.extend(collected.records);
                removable = collected.removable;
            }
        }

        let items = if item.kind == ItemKind::Directory && self.walker.recursive {
            match self.build_children(item, pass, sink)? {
                Ok(children) => Some(children),
                Err(reason) => return Ok(self.skip(EventKind::DirectoryUnreadable, item, reason)),
            }
        } else {
            None
        };

        let bytes = match (&items, kind) {
            (Some(children), _) => children.iter().map(|c| c.size.bytes).sum(),
            (None, EntryKind::Directory) => 0,
            (None, EntryKind::File) => lstat.len(),
        };

        let entry = Entry {
            id,
            id_algorithm: self.engine.primary(),
            kind,
            name: EntryName {
                text: item.name.clone(),
                hashes: self.engine.name(&item.name),
            },
            extension,
            size: EntrySize::new(bytes),
            hashes,
            timestamps,
            attributes: EntryAttributes {
                is_link: item.kind.is_link(),
                link_target,
            },
            items,
            metadata,
        };
        sink.accept(&item.path, &entry)?;
        // Queued only once the records they feed have reached the sink.
        for path in &removable {
            pass.queue.push(path);
        }
        Ok(Outcome::Built(entry))
    }

    /// Build every visible child of `dir`, files first.
    ///
    /// The inner `Err` carries the reason the directory could not be listed.
    fn build_children(
        &self,
        dir: &FilesystemItem,
        pass: &mut Pass<'_>,
        sink: &mut dyn EntrySink,
    ) -> Result<Result<Vec<Entry>, String>, BuildError> {
        let listing = match list_children(&dir.path, &self.walker.exclusions) {
            Ok(listing) => listing,
            Err(e) => return Ok(Err(e.to_string())),
        };
        for (path, reason) in &listing.excluded {
            self.events
                .emit(BuildEvent::new(EventKind::Excluded, path).with_detail(reason.clone()));
        }
        for (path, reason) in &listing.dropped {
            self.events
                .emit(BuildEvent::new(EventKind::EntryDropped, path).with_detail(reason.clone()));
        }

        let plan = match &self.sidecars {
            Some(classifier) => ClaimPlan::build(classifier, &listing.names()),
            None => ClaimPlan::default(),
        };
        pass.hidden += plan.hidden_count();

        let mut children = Vec::with_capacity(listing.files.len() + listing.dirs.len());
        let mut captured: HashSet<&str> = HashSet::new();
        let mut orphaned: Vec<&str> = Vec::new();
        for child in listing.files.iter().chain(listing.dirs.iter()) {
            if plan.is_hidden(&child.name) {
                continue;
            }
            let claims = plan.classifications(&child.name);
            match self.build_item(child, claims, &|name: &str| plan.is_hidden(name), pass, sink)? {
                Outcome::Built(entry) => {
                    captured.extend(claims.iter().map(|c| c.sibling.as_str()));
                    children.push(entry);
                }
                Outcome::Skipped(_) => {
                    pass.skipped += 1;
                    orphaned.extend(
                        claims
                            .iter()
                            .map(|c| c.sibling.as_str())
                            .filter(|name| plan.is_hidden(name)),
                    );
                }
            }
        }

        // Sidecars of a skipped item are no longer carried by any record.
        let released: HashSet<&str> = orphaned
            .into_iter()
            .filter(|name| !captured.contains(name))
            .collect();
        if !released.is_empty() {
            let listed = || listing.files.iter().chain(listing.dirs.iter());
            for child in listed().filter(|c| released.contains(c.name.as_str())) {
                pass.hidden = pass.hidden.saturating_sub(1);
                self.emit(EventKind::SidecarReleased, child, "claiming item was skipped");
                match self.build_item(child, &[], &|_: &str| false, pass, sink)? {
                    Outcome::Built(entry) => children.push(entry),
                    Outcome::Skipped(_) => pass.skipped += 1,
                }
            }
            let position: HashMap<&str, usize> = listed()
                .enumerate()
                .map(|(index, c)| (c.name.as_str(), index))
                .collect();
            children.sort_by_key(|e| position.get(e.name.text.as_str()).copied());
        }
        Ok(Ok(children))
    }
}
