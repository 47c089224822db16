//! Output sinks
//!
//! The builder hands each completed entry to [`EntrySink::accept`] in post-order,
//! then the run hands the root to [`EntrySink::finish`]. File outputs are written
//! to a temporary path and renamed into place.

use crate::error::SinkError;
use crate::tree::node::Entry;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FILE_META_SUFFIX: &str = "_meta.json";
pub const DIRECTORY_META_SUFFIX: &str = "_directorymeta.json";

/// Receiver of completed entries.
pub trait EntrySink {
    /// Called once per completed entry, children before parents.
    fn accept(&mut self, _path: &Path, _entry: &Entry) -> Result<(), SinkError> {
        Ok(())
    }

    /// Called once with the finished root.
    fn finish(&mut self, _root: &Entry) -> Result<(), SinkError> {
        Ok(())
    }

    /// Files this sink has written so far.
    fn persisted(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SinkError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_err(source)
    })
}

fn encode(entry: &Entry, pretty: bool) -> Result<Vec<u8>, SinkError> {
    let mut bytes = if pretty {
        serde_json::to_vec_pretty(entry)?
    } else {
        serde_json::to_vec(entry)?
    };
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes the whole tree to a stream when the build finishes.
pub struct JsonTreeSink<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonTreeSink<W> {
    pub fn new(writer: W, pretty: bool) -> Self {
        Self { writer, pretty }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EntrySink for JsonTreeSink<W> {
    fn finish(&mut self, root: &Entry) -> Result<(), SinkError> {
        let bytes = encode(root, self.pretty)?;
        self.writer.write_all(&bytes).map_err(SinkError::Stream)?;
        self.writer.flush().map_err(SinkError::Stream)
    }
}

/// Writes the whole tree to a file when the build finishes.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    pretty: bool,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            path: path.into(),
            pretty,
        }
    }
}

impl EntrySink for JsonFileSink {
    fn finish(&mut self, root: &Entry) -> Result<(), SinkError> {
        write_atomic(&self.path, &encode(root, self.pretty)?)?;
        debug!(path = %self.path.display(), "Tree written");
        Ok(())
    }

    fn persisted(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}

/// Path of the in-place record for an item.
pub fn inplace_path(item: &Path, is_dir: bool) -> Option<PathBuf> {
    let name = item.file_name()?.to_string_lossy();
    let parent = item.parent()?;
    let suffix = if is_dir {
        DIRECTORY_META_SUFFIX
    } else {
        FILE_META_SUFFIX
    };
    Some(parent.join(format!("{}{}", name, suffix)))
}

/// Writes one record per item next to the item itself.
///
/// Directory records omit `items`; each child has its own record.
#[derive(Debug, Default)]
pub struct InPlaceSink {
    pretty: bool,
    written: Vec<PathBuf>,
}

impl InPlaceSink {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl EntrySink for InPlaceSink {
    fn accept(&mut self, path: &Path, entry: &Entry) -> Result<(), SinkError> {
        let Some(target) = inplace_path(path, entry.is_dir()) else {
            debug!(path = %path.display(), "No parent directory for in-place record");
            return Ok(());
        };
        write_atomic(&target, &encode(&entry.without_items(), self.pretty)?)?;
        self.written.push(target);
        Ok(())
    }

    fn persisted(&self) -> Vec<PathBuf> {
        self.written.clone()
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EntrySink for NullSink {}

/// Keeps the path and id of every accepted entry, and the finished root.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub accepted: Vec<(PathBuf, String)>,
    pub root: Option<Entry>,
}

impl EntrySink for RecordingSink {
    fn accept(&mut self, path: &Path, entry: &Entry) -> Result<(), SinkError> {
        self.accepted.push((path.to_path_buf(), entry.id.clone()));
        Ok(())
    }

    fn finish(&mut self, root: &Entry) -> Result<(), SinkError> {
        self.root = Some(root.clone());
        Ok(())
    }
}
