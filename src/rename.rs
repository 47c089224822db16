//! Rename step
//!
//! After output is persisted, regular files can be renamed to `<_id><.ext>`.
//! Symlinks and directories keep their names. A target name that already exists
//! is reported as a collision and left alone.

use crate::sink::{inplace_path, FILE_META_SUFFIX};
use crate::tree::node::Entry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenameReport {
    pub renamed: Vec<RenamePlan>,
    /// Listed but not applied (dry run).
    pub planned: Vec<RenamePlan>,
    pub collisions: Vec<RenamePlan>,
    pub failed: Vec<(PathBuf, String)>,
}

fn target_name(entry: &Entry) -> String {
    match &entry.extension {
        Some(ext) => format!("{}.{}", entry.id, ext),
        None => entry.id.clone(),
    }
}

fn collect(entry: &Entry, path: &Path, inplace: bool, plans: &mut Vec<RenamePlan>) {
    if entry.is_dir() {
        for child in entry.children() {
            collect(child, &path.join(&child.name.text), inplace, plans);
        }
        return;
    }
    if entry.attributes.is_link {
        return;
    }
    let Some(parent) = path.parent() else {
        return;
    };
    let new_name = target_name(entry);
    if new_name == entry.name.text {
        return;
    }
    let to = parent.join(&new_name);
    if inplace {
        if let Some(record) = inplace_path(path, false) {
            plans.push(RenamePlan {
                from: record,
                to: parent.join(format!("{}{}", new_name, FILE_META_SUFFIX)),
            });
        }
    }
    plans.push(RenamePlan {
        from: path.to_path_buf(),
        to,
    });
}

/// Every rename the tree calls for, in tree order.
///
/// With `inplace`, each file's `_meta.json` record is renamed with it.
pub fn plan_renames(root: &Entry, root_path: &Path, inplace: bool) -> Vec<RenamePlan> {
    let mut plans = Vec::new();
    collect(root, root_path, inplace, &mut plans);
    plans
}

/// Apply (or, with `dry_run`, only list) the planned renames.
pub fn apply_renames(plans: Vec<RenamePlan>, dry_run: bool) -> RenameReport {
    let mut report = RenameReport::default();
    for plan in plans {
        if dry_run {
            debug!(from = %plan.from.display(), to = %plan.to.display(), "Planned rename");
            report.planned.push(plan);
            continue;
        }
        if !plan.from.exists() {
            // In-place records are only present when the sink wrote them.
            continue;
        }
        if plan.to.exists() {
            warn!(from = %plan.from.display(), to = %plan.to.display(), "Rename target exists");
            report.collisions.push(plan);
            continue;
        }
        match std::fs::rename(&plan.from, &plan.to) {
            Ok(()) => report.renamed.push(plan),
            Err(e) => {
                warn!(from = %plan.from.display(), error = %e, "Rename failed");
                report.failed.push((plan.from, e.to_string()));
            }
        }
    }
    info!(
        renamed = report.renamed.len(),
        planned = report.planned.len(),
        collisions = report.collisions.len(),
        failed = report.failed.len(),
        "Rename step finished"
    );
    report
}
