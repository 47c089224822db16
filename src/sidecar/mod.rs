//! Sidecar classifier
//!
//! Finds auxiliary files next to an item by name, reads them through a format
//! fallback chain, and turns each into a [`MetadataRecord`].

pub mod plan;
pub mod reader;
pub mod record;
pub mod rules;

pub use plan::ClaimPlan;
pub use record::{DataFormat, MetadataRecord, RecordOrigin, Transform};
pub use rules::{default_rules, RuleTable, SidecarFormat, SidecarRule};

use crate::error::ConfigError;
use crate::events::{BuildEvent, EventKind, EventSink};
use crate::timestamps::TimestampSource;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A sibling claimed by an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub sibling: String,
    /// Winning rule.
    pub rule_index: usize,
    /// Later rules that also matched.
    pub shadowed: Vec<usize>,
}

/// Everything needed to turn claimed siblings into records.
pub struct CollectContext<'a> {
    pub timestamps: &'a dyn TimestampSource,
    pub events: &'a dyn EventSink,
}

/// Records read for one item.
#[derive(Debug, Default)]
pub struct Collected {
    pub records: Vec<MetadataRecord>,
    /// Captured sidecars that may be removed once the owning entry is accepted.
    pub removable: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SidecarClassifier {
    rules: RuleTable,
    exclude: Vec<Pattern>,
    delete: bool,
}

impl SidecarClassifier {
    pub fn new(rules: RuleTable, exclude: &[String]) -> Result<Self, ConfigError> {
        let exclude = exclude
            .iter()
            .map(|g| {
                Pattern::new(g).map_err(|e| ConfigError::Glob {
                    pattern: g.clone(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            exclude,
            delete: false,
        })
    }

    /// Queue captured sidecars for removal once output is persisted.
    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn deletes(&self) -> bool {
        self.delete
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }

    /// Classify `siblings` for `item_name`.
    ///
    /// Depends only on the names and the rule table; the result follows the
    /// order of `siblings`.
    pub fn classify(&self, item_name: &str, siblings: &[String]) -> Vec<Classification> {
        let candidates: Vec<&String> = siblings
            .iter()
            .filter(|s| s.as_str() != item_name && !self.is_excluded(s))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        let matcher = self.rules.matcher(item_name);
        candidates
            .into_iter()
            .filter_map(|sibling| {
                let hits = matcher.matching_rules(sibling);
                let (&rule_index, rest) = hits.split_first()?;
                Some(Classification {
                    sibling: sibling.clone(),
                    rule_index,
                    shadowed: rest.to_vec(),
                })
            })
            .collect()
    }

    /// Read each classified sibling in `dir` and build its record.
    ///
    /// `deletable` decides per sibling whether a successful capture is listed as
    /// removable; it is only consulted when deletion is enabled. Nothing is queued
    /// here: the caller hands `removable` to the delete queue after the entry
    /// carrying these records has reached the sink.
    pub fn collect(
        &self,
        dir: &Path,
        classifications: &[Classification],
        ctx: &CollectContext<'_>,
        deletable: impl Fn(&str) -> bool,
    ) -> Collected {
        let mut collected = Collected {
            records: Vec::with_capacity(classifications.len()),
            removable: Vec::new(),
        };
        for classification in classifications {
            let Some(rule) = self.rules.get(classification.rule_index) else {
                continue;
            };
            let path = dir.join(&classification.sibling);

            if !classification.shadowed.is_empty() {
                let others: Vec<&str> = classification
                    .shadowed
                    .iter()
                    .filter_map(|i| self.rules.get(*i))
                    .map(|r| r.sidecar_type.as_str())
                    .collect();
                ctx.events.emit(
                    BuildEvent::new(EventKind::AmbiguousSidecar, &path).with_detail(format!(
                        "classified as '{}', also matched {}",
                        rule.sidecar_type,
                        others.join(", ")
                    )),
                );
            }

            let timestamps = ctx.timestamps.stat(&path);
            let (decoded, size) = match std::fs::read(&path) {
                Ok(bytes) => {
                    if self.delete && deletable(&classification.sibling) {
                        collected.removable.push(path.clone());
                    }
                    (reader::decode(&bytes, rule.format), bytes.len() as u64)
                }
                Err(e) => {
                    ctx.events.emit(
                        BuildEvent::new(EventKind::SidecarUnreadable, &path)
                            .with_detail(e.to_string()),
                    );
                    (reader::error_payload(&e), 0)
                }
            };

            collected.records.push(MetadataRecord::discovered(
                rule.sidecar_type.clone(),
                classification.sibling.clone(),
                size,
                timestamps,
                decoded.format,
                decoded.value,
                decoded.reversed,
            ));
        }
        collected
    }
}
