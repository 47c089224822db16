#![cfg(unix)]

use crate::support::{builder_for, quiet_config, workspace, write};
use fsdex::cancel::CancellationToken;
use fsdex::delete_queue::DeleteQueue;
use fsdex::events::{EventKind, RecordingEventSink};
use fsdex::sink::NullSink;
use fsdex::tree::{FilesystemItem, LinkTarget, TreeBuilder};
use fsdex::Entry;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::sync::Arc;

fn build_with_events(builder: TreeBuilder, path: &Path) -> (Entry, Arc<RecordingEventSink>) {
    let events = Arc::new(RecordingEventSink::new());
    let builder = builder.with_events(events.clone());
    let item = FilesystemItem::resolve(path).unwrap();
    let root = builder
        .build(&item, &DeleteQueue::new(), &CancellationToken::new(), &mut NullSink)
        .unwrap()
        .root;
    (root, events)
}

#[test]
fn dangling_link_is_indexed_once_without_failing() {
    let (_temp, root) = workspace();
    write(&root, "real.txt", b"real");
    symlink(root.join("missing.txt"), root.join("broken")).unwrap();

    let (tree, events) = build_with_events(builder_for(&quiet_config()), &root);

    let broken = tree
        .children()
        .iter()
        .find(|c| c.name.text == "broken")
        .unwrap();
    assert!(broken.attributes.is_link);
    assert_eq!(broken.attributes.link_target, Some(LinkTarget::Dangling));
    assert!(broken.id.starts_with('y'));
    let link_len = std::fs::symlink_metadata(root.join("broken")).unwrap().len();
    assert_eq!(broken.size.bytes, link_len);
    assert_eq!(events.count(EventKind::DanglingLink), 1);
    assert_eq!(tree.counts().links, 1);
}

#[test]
fn file_link_carries_target_content_but_name_identity() {
    let (_temp, root) = workspace();
    let real = write(&root, "real.txt", b"real");
    symlink(&real, root.join("alias.txt")).unwrap();

    let (tree, events) = build_with_events(builder_for(&quiet_config()), &root);
    let find = |name: &str| tree.children().iter().find(|c| c.name.text == name).unwrap();
    let alias = find("alias.txt");
    let real_entry = find("real.txt");

    assert_eq!(alias.attributes.link_target, Some(LinkTarget::File));
    assert_eq!(alias.hashes, real_entry.hashes);
    assert_ne!(alias.id, real_entry.id);
    assert!(events.events().is_empty());
}

#[test]
fn directory_link_is_not_followed() {
    let (_temp, root) = workspace();
    write(&root, "data/inner.txt", b"inner");
    symlink(root.join("data"), root.join("shortcut")).unwrap();

    let (tree, _) = build_with_events(builder_for(&quiet_config()), &root);
    let shortcut = tree
        .children()
        .iter()
        .find(|c| c.name.text == "shortcut")
        .unwrap();
    assert!(!shortcut.is_dir());
    assert_eq!(shortcut.attributes.link_target, Some(LinkTarget::Directory));
    assert!(shortcut.items.is_none());
    assert_eq!(tree.counts().files, 1);
}

#[test]
fn link_cycle_terminates() {
    let (_temp, root) = workspace();
    write(&root, "loop/f", b"f");
    symlink(root.join("loop"), root.join("loop/back")).unwrap();

    let (tree, _) = build_with_events(builder_for(&quiet_config()), &root);
    let inner = &tree.children()[0];
    assert_eq!(inner.children().len(), 2);
    assert_eq!(tree.counts().links, 1);
}
