//! Entry types
//!
//! An [`Entry`] is the finished record for one filesystem item. Directories own
//! their children; every other kind, symlinks included, is a `file` entry.

use crate::sidecar::MetadataRecord;
use crate::timestamps::Timestamps;
use crate::types::{HashAlgorithm, IdentitySet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// What a symlink points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTarget {
    File,
    Directory,
    Dangling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryName {
    pub text: String,
    /// Single-layer digests of `text`.
    pub hashes: IdentitySet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySize {
    pub text: String,
    pub bytes: u64,
}

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

impl EntrySize {
    pub fn new(bytes: u64) -> Self {
        Self {
            text: human_size(bytes),
            bytes,
        }
    }
}

/// Render a byte count with binary units, e.g. `1.50 KiB`.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttributes {
    pub is_link: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<LinkTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "_id")]
    pub id: String,
    pub id_algorithm: HashAlgorithm,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: EntryName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub size: EntrySize,
    /// Content digests; files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<IdentitySet>,
    pub timestamps: Timestamps,
    pub attributes: EntryAttributes,
    /// Children; directories only, and absent when children were not visited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Entry>>,
    #[serde(default)]
    pub metadata: Vec<MetadataRecord>,
}

/// Totals over an entry tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryCounts {
    pub files: usize,
    pub links: usize,
    pub directories: usize,
    pub records: usize,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn children(&self) -> &[Entry] {
        self.items.as_deref().unwrap_or(&[])
    }

    /// Copy of this entry without its children.
    pub fn without_items(&self) -> Entry {
        Entry {
            id: self.id.clone(),
            id_algorithm: self.id_algorithm,
            kind: self.kind,
            name: self.name.clone(),
            extension: self.extension.clone(),
            size: self.size.clone(),
            hashes: self.hashes.clone(),
            timestamps: self.timestamps.clone(),
            attributes: self.attributes.clone(),
            items: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Visit this entry and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Entry)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn counts(&self) -> EntryCounts {
        let mut counts = EntryCounts::default();
        self.walk(&mut |entry| {
            counts.records += entry.metadata.len();
            if entry.is_dir() {
                counts.directories += 1;
            } else if entry.attributes.is_link {
                counts.links += 1;
            } else {
                counts.files += 1;
            }
        });
        counts
    }
}
