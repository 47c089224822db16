use crate::support::{build, builder_for, quiet_config, workspace, write};
use fsdex::delete_queue::DeleteQueue;
use fsdex::sidecar::{DataFormat, Transform};
use fsdex::IndexerConfig;
use serde_json::json;
use std::fs;

fn merging() -> IndexerConfig {
    let mut config = quiet_config();
    config.sidecar.merge = true;
    config
}

#[test]
fn json_sidecar_becomes_one_record() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    write(&root, "a.txt_meta.json", br#"{"k":1}"#);

    let queue = DeleteQueue::new();
    let outcome = build(&builder_for(&merging()), &root, &queue);

    assert_eq!(outcome.hidden_sidecars, 1);
    let children = outcome.root.children();
    assert_eq!(children.len(), 1);
    let entry = &children[0];
    assert_eq!(entry.name.text, "a.txt");
    assert_eq!(entry.metadata.len(), 1);

    let record = &entry.metadata[0];
    assert_eq!(record.record_type, "metadata");
    assert_eq!(record.format, DataFormat::Json);
    assert_eq!(record.value, json!({"k": 1}));
    assert_eq!(record.source_name(), Some("a.txt_meta.json"));
    assert!(queue.is_empty());
}

#[test]
fn without_merge_sidecars_are_plain_items() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    write(&root, "a.txt_meta.json", br#"{"k":1}"#);

    let outcome = build(&builder_for(&quiet_config()), &root, &DeleteQueue::new());
    assert_eq!(outcome.hidden_sidecars, 0);
    assert_eq!(outcome.root.children().len(), 2);
    assert!(outcome.root.children().iter().all(|c| c.metadata.is_empty()));
}

#[test]
fn unparseable_sidecars_fall_back() {
    let (_temp, root) = workspace();
    write(&root, "clip.mp4", b"video");
    write(&root, "clip.info.json", b"not json at all");
    write(&root, "clip.description", [0xffu8, 0xfe, 0x00]);
    write(&root, "clip-thumb.jpg", [0xffu8, 0xd8, 0xff]);

    let tree = build(&builder_for(&merging()), &root, &DeleteQueue::new()).root;
    assert_eq!(tree.children().len(), 1);
    let records = &tree.children()[0].metadata;
    assert_eq!(records.len(), 3);

    let by_type = |t: &str| records.iter().find(|r| r.record_type == t).unwrap();
    let info = by_type("info");
    assert_eq!(info.format, DataFormat::Text);
    assert_eq!(info.value, json!("not json at all"));

    let description = by_type("description");
    assert_eq!(description.format, DataFormat::Binary);
    assert_eq!(description.value, json!("//4A"));
    assert_eq!(description.reversed, vec![Transform::Base64]);

    let thumb = by_type("thumbnail");
    assert_eq!(thumb.format, DataFormat::Binary);
    assert_eq!(thumb.value, json!("/9j/"));
}

#[test]
fn yaml_sidecar_is_structured() {
    let (_temp, root) = workspace();
    write(&root, "song.flac", b"audio");
    write(&root, "song.yaml", b"artist: Someone\nyear: 1999\n");

    let tree = build(&builder_for(&merging()), &root, &DeleteQueue::new()).root;
    let record = &tree.children()[0].metadata[0];
    assert_eq!(record.record_type, "generic_metadata");
    assert_eq!(record.format, DataFormat::Yaml);
    assert_eq!(record.value, json!({"artist": "Someone", "year": 1999}));
}

#[test]
fn directory_sidecar_attaches_to_directory() {
    let (_temp, root) = workspace();
    write(&root, "album/track.flac", b"audio");
    write(&root, "album_directorymeta.json", br#"{"title":"A"}"#);

    let tree = build(&builder_for(&merging()), &root, &DeleteQueue::new()).root;
    assert_eq!(tree.children().len(), 1);
    let album = &tree.children()[0];
    assert!(album.is_dir());
    assert_eq!(album.metadata.len(), 1);
    assert_eq!(album.metadata[0].value, json!({"title": "A"}));
}

#[test]
fn delete_queues_hidden_sidecars_without_touching_them() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    let sidecar = write(&root, "a.txt_meta.json", br#"{"k":1}"#);
    write(&root, "b.txt", b"beta");

    let mut config = merging();
    config.sidecar.delete = true;
    let queue = DeleteQueue::new();
    build(&builder_for(&config), &root, &queue);

    assert_eq!(queue.snapshot(), vec![sidecar.clone()]);
    assert!(sidecar.exists());

    let report = queue.drain();
    assert_eq!(report.removed, vec![sidecar.clone()]);
    assert!(!sidecar.exists());
    assert!(root.join("a.txt").exists());
}

#[test]
fn target_file_collects_its_own_sidecars() {
    let (_temp, root) = workspace();
    let target = write(&root, "a.txt", b"alpha");
    let sidecar = write(&root, "a.description", b"about a");

    let mut config = merging();
    config.sidecar.delete = true;
    let queue = DeleteQueue::new();
    let entry = build(&builder_for(&config), &target, &queue).root;

    assert_eq!(entry.metadata.len(), 1);
    assert_eq!(entry.metadata[0].value, json!("about a"));
    assert_eq!(queue.snapshot(), vec![sidecar]);
}

#[test]
fn decomposed_sidecar_names_match_composed_items() {
    let (_temp, root) = workspace();
    write(&root, "caf\u{e9}.txt", b"coffee");
    write(&root, "cafe\u{301}.description", b"notes");

    let tree = build(&builder_for(&merging()), &root, &DeleteQueue::new()).root;
    let visible: Vec<_> = tree.children().iter().map(|c| c.name.text.clone()).collect();
    assert_eq!(visible.len(), 1, "{:?}", visible);
    assert_eq!(tree.children()[0].metadata.len(), 1);
    // Source files are never modified by a build.
    assert_eq!(fs::read(root.join("caf\u{e9}.txt")).unwrap(), b"coffee");
}
