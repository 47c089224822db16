//! Shared fixtures.

use fsdex::cancel::CancellationToken;
use fsdex::delete_queue::DeleteQueue;
use fsdex::sink::NullSink;
use fsdex::tree::{BuildOutcome, FilesystemItem, TreeBuilder};
use fsdex::IndexerConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Defaults with the external extractor switched off.
pub fn quiet_config() -> IndexerConfig {
    let mut config = IndexerConfig::default();
    config.extractor.enabled = false;
    config
}

/// Tempdir with a `root` directory inside, so the target's own siblings are
/// under test control.
pub fn workspace() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    (temp, root)
}

pub fn write(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

pub fn builder_for(config: &IndexerConfig) -> TreeBuilder {
    let resolved = config.validate().unwrap();
    let mut builder = TreeBuilder::new(resolved.engine).with_walker_config(resolved.walker);
    if let Some(classifier) = resolved.sidecars {
        builder = builder.with_sidecars(classifier);
    }
    builder
}

pub fn build(builder: &TreeBuilder, path: &Path, queue: &DeleteQueue) -> BuildOutcome {
    let item = FilesystemItem::resolve(path).unwrap();
    builder
        .build(&item, queue, &CancellationToken::new(), &mut NullSink)
        .unwrap()
}
