//! Directory listing
//!
//! Lists one directory level at a time. Symlinks are never followed: a link to a
//! directory comes back as a leaf, the same way a link to a file does.

use crate::error::{ConfigError, WalkError};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What an item is, as seen without dereferencing links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
    SymlinkToFile,
    SymlinkToDirectory,
    /// Symlink whose target cannot be resolved.
    Dangling,
}

impl ItemKind {
    pub fn is_link(&self) -> bool {
        matches!(
            self,
            ItemKind::SymlinkToFile | ItemKind::SymlinkToDirectory | ItemKind::Dangling
        )
    }

    /// Classify from a non-following file type. Links are probed once.
    fn from_file_type(path: &Path, file_type: std::fs::FileType) -> Option<Self> {
        if file_type.is_symlink() {
            return Some(match std::fs::metadata(path) {
                Ok(target) if target.is_dir() => ItemKind::SymlinkToDirectory,
                Ok(_) => ItemKind::SymlinkToFile,
                Err(_) => ItemKind::Dangling,
            });
        }
        if file_type.is_dir() {
            Some(ItemKind::Directory)
        } else if file_type.is_file() {
            Some(ItemKind::File)
        } else {
            None
        }
    }
}

/// A resolved path ready to be turned into an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemItem {
    pub path: PathBuf,
    pub name: String,
    pub kind: ItemKind,
}

impl FilesystemItem {
    /// Inspect a single path without following it.
    pub fn resolve(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        let kind = ItemKind::from_file_type(path, metadata.file_type()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "unsupported file type")
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            name: display_name(path),
            kind,
        })
    }

    /// Name of the directory holding this item; empty at a filesystem root.
    pub fn parent_name(&self) -> String {
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Name and glob exclusion filters, both case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    names: HashSet<String>,
    globs: Vec<Pattern>,
}

impl Exclusions {
    pub fn new(names: &[String], globs: &[String]) -> Result<Self, ConfigError> {
        let globs = globs
            .iter()
            .map(|g| {
                Pattern::new(g).map_err(|e| ConfigError::Glob {
                    pattern: g.clone(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            names: names.iter().map(|n| n.to_lowercase()).collect(),
            globs,
        })
    }

    /// Why `name` is excluded, if it is.
    pub fn reason(&self, name: &str) -> Option<String> {
        if self.names.contains(&name.to_lowercase()) {
            return Some(format!("name '{}'", name));
        }
        self.globs
            .iter()
            .find(|g| g.matches_with(name, MATCH_OPTIONS))
            .map(|g| format!("glob '{}'", g.as_str()))
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.reason(name).is_some()
    }
}

/// How the builder walks a tree.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub exclusions: Exclusions,
    /// Descend into directories; when off a directory target is indexed alone.
    pub recursive: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            exclusions: Exclusions::default(),
            recursive: true,
        }
    }
}

/// One directory level split into leaves and subdirectories.
#[derive(Debug, Default)]
pub struct Listing {
    /// Regular files and every kind of symlink, sorted.
    pub files: Vec<FilesystemItem>,
    pub dirs: Vec<FilesystemItem>,
    /// Filtered entries with the matching rule.
    pub excluded: Vec<(PathBuf, String)>,
    /// Entries that could not be classified.
    pub dropped: Vec<(PathBuf, String)>,
}

impl Listing {
    /// Names of all listed items, files first.
    pub fn names(&self) -> Vec<String> {
        self.files
            .iter()
            .chain(self.dirs.iter())
            .map(|i| i.name.clone())
            .collect()
    }
}

fn sort_items(items: &mut [FilesystemItem]) {
    items.sort_by_cached_key(|i| (i.name.to_lowercase(), i.name.clone()));
}

/// List the immediate children of `dir`.
///
/// Failing to open `dir` is an error for the whole directory. A child that cannot
/// be classified is reported in [`Listing::dropped`] and the rest is returned.
pub fn list_children(dir: &Path, exclusions: &Exclusions) -> Result<Listing, WalkError> {
    let mut listing = Listing::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 || e.path() == Some(dir) {
                    let message = e.to_string();
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
                    return Err(WalkError::Unreadable {
                        path: dir.to_path_buf(),
                        source,
                    });
                }
                let path = e.path().unwrap_or(dir).to_path_buf();
                listing.dropped.push((path, e.to_string()));
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path().to_path_buf();
        if let Some(reason) = exclusions.reason(&name) {
            listing.excluded.push((path, reason));
            continue;
        }

        let Some(kind) = ItemKind::from_file_type(&path, entry.file_type()) else {
            listing
                .dropped
                .push((path, "unsupported file type".to_string()));
            continue;
        };
        let item = FilesystemItem { path, name, kind };
        if kind == ItemKind::Directory {
            listing.dirs.push(item);
        } else {
            listing.files.push(item);
        }
    }

    sort_items(&mut listing.files);
    sort_items(&mut listing.dirs);
    Ok(listing)
}

/// Names of the entries next to `path`, used for sidecar discovery of a lone target.
pub fn sibling_names(path: &Path, exclusions: &Exclusions) -> Result<Vec<String>, WalkError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            Ok(list_children(parent, exclusions)?.names())
        }
        _ => Ok(Vec::new()),
    }
}
