use crate::support::{builder_for, quiet_config, workspace, write};
use fsdex::cancel::CancellationToken;
use fsdex::delete_queue::DeleteQueue;
use fsdex::error::SinkError;
use fsdex::sink::EntrySink;
use fsdex::tree::FilesystemItem;
use fsdex::{BuildError, Entry};
use std::path::{Path, PathBuf};

/// Cancels the shared token once it has accepted `limit` entries.
struct CancelAfter {
    token: CancellationToken,
    limit: usize,
    accepted: Vec<(PathBuf, Entry)>,
    finished: bool,
}

impl EntrySink for CancelAfter {
    fn accept(&mut self, path: &Path, entry: &Entry) -> Result<(), SinkError> {
        self.accepted.push((path.to_path_buf(), entry.clone()));
        if self.accepted.len() >= self.limit {
            self.token.cancel();
        }
        Ok(())
    }

    fn finish(&mut self, _root: &Entry) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

#[test]
fn cancel_midway_keeps_only_complete_entries() {
    let (_temp, root) = workspace();
    for i in 0..10 {
        write(&root, &format!("f{:02}", i), format!("content {}", i));
    }

    let token = CancellationToken::new();
    let mut sink = CancelAfter {
        token: token.clone(),
        limit: 3,
        accepted: Vec::new(),
        finished: false,
    };
    let queue = DeleteQueue::new();
    let item = FilesystemItem::resolve(&root).unwrap();
    let result = builder_for(&quiet_config()).build(&item, &queue, &token, &mut sink);

    assert!(matches!(result, Err(BuildError::Cancelled)));
    assert_eq!(sink.accepted.len(), 3);
    assert!(!sink.finished);
    // No parent was emitted, and every emitted entry is a finished leaf.
    assert!(sink.accepted.iter().all(|(path, _)| path != &root));
    for (path, entry) in &sink.accepted {
        assert!(entry.id.starts_with('y'));
        assert!(entry.hashes.is_some());
        assert_eq!(path.file_name().unwrap().to_string_lossy(), entry.name.text);
    }
}

#[test]
fn cancel_before_start_emits_nothing() {
    let (_temp, root) = workspace();
    write(&root, "a", b"a");

    let token = CancellationToken::new();
    token.cancel();
    let mut sink = CancelAfter {
        token: token.clone(),
        limit: usize::MAX,
        accepted: Vec::new(),
        finished: false,
    };
    let item = FilesystemItem::resolve(&root).unwrap();
    let result = builder_for(&quiet_config()).build(&item, &DeleteQueue::new(), &token, &mut sink);

    assert!(matches!(result, Err(BuildError::Cancelled)));
    assert!(sink.accepted.is_empty());
}

#[test]
fn cancelled_merge_leaves_queue_undrained() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"a");
    let sidecar = write(&root, "a.txt_meta.json", b"{}");
    write(&root, "b.txt", b"b");

    let mut config = quiet_config();
    config.sidecar.merge = true;
    config.sidecar.delete = true;
    let token = CancellationToken::new();
    let mut sink = CancelAfter {
        token: token.clone(),
        limit: 1,
        accepted: Vec::new(),
        finished: false,
    };
    let queue = DeleteQueue::new();
    let item = FilesystemItem::resolve(&root).unwrap();
    let result = builder_for(&config).build(&item, &queue, &token, &mut sink);

    assert!(result.is_err());
    assert_eq!(queue.len(), 1);
    // Nothing is removed unless the caller drains after persisting output.
    assert!(sidecar.exists());
}
