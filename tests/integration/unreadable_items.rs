#![cfg(unix)]

use crate::support::{builder_for, quiet_config, workspace, write};
use fsdex::cancel::CancellationToken;
use fsdex::delete_queue::DeleteQueue;
use fsdex::events::{EventKind, RecordingEventSink};
use fsdex::sink::{JsonFileSink, NullSink};
use fsdex::tree::FilesystemItem;
use fsdex::{Entry, Indexer, IndexerConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

/// Drop every permission bit on `path`. Returns false when the process can
/// still read it (running as root), restoring the mode in that case.
fn lock(path: &Path) -> bool {
    fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
    let denied = if path.is_dir() {
        fs::read_dir(path).is_err()
    } else {
        fs::read(path).is_err()
    };
    if !denied {
        unlock(path);
    }
    denied
}

fn unlock(path: &Path) {
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn merge_and_delete() -> IndexerConfig {
    let mut config = quiet_config();
    config.sidecar.merge = true;
    config.sidecar.delete = true;
    config
}

fn child_names(entry: &Entry) -> Vec<&str> {
    entry
        .children()
        .iter()
        .map(|c| c.name.text.as_str())
        .collect()
}

#[test]
fn unreadable_directory_does_not_lose_its_sidecar() {
    let (temp, root) = workspace();
    let sub = root.join("sub");
    fs::create_dir(&sub).unwrap();
    let sidecar = write(&root, "sub_directorymeta.json", br#"{"precious":"MARKER123"}"#);
    if !lock(&sub) {
        return;
    }

    let out = temp.path().join("tree.json");
    let mut sink = JsonFileSink::new(&out, false);
    let result = Indexer::new(&merge_and_delete())
        .unwrap()
        .run(&root, &mut sink, &CancellationToken::new());
    unlock(&sub);
    let report = result.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.queued_sidecars, 0);
    assert_eq!(report.hidden_sidecars, 0);
    assert!(sidecar.exists());

    let tree: Entry = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(child_names(&tree), vec!["sub_directorymeta.json"]);
}

#[test]
fn sidecars_of_a_skipped_file_become_items() {
    let (_temp, root) = workspace();
    write(&root, "a.description", b"about a");
    let primary = write(&root, "a.txt", b"alpha");
    write(&root, "a.txt_meta.json", br#"{"precious":"MARKER456"}"#);
    write(&root, "b.txt", b"beta");
    if !lock(&primary) {
        return;
    }

    let events = Arc::new(RecordingEventSink::new());
    let builder = builder_for(&merge_and_delete()).with_events(events.clone());
    let queue = DeleteQueue::new();
    let item = FilesystemItem::resolve(&root).unwrap();
    let result = builder.build(&item, &queue, &CancellationToken::new(), &mut NullSink);
    unlock(&primary);
    let outcome = result.unwrap();

    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.hidden_sidecars, 0);
    assert!(queue.is_empty());
    assert_eq!(events.count(EventKind::SidecarReleased), 2);
    // Listing order survives the late additions.
    assert_eq!(
        child_names(&outcome.root),
        vec!["a.description", "a.txt_meta.json", "b.txt"]
    );
    assert_eq!(outcome.root.size.bytes, 7 + 24 + 4);
}
