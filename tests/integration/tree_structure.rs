use crate::support::{build, builder_for, quiet_config, workspace, write};
use fsdex::delete_queue::DeleteQueue;
use fsdex::tree::hasher::hash_bytes;
use fsdex::tree::EntryKind;
use fsdex::HashAlgorithm;
use std::fs;

#[test]
fn nested_tree_has_expected_shape() {
    let (_temp, root) = workspace();
    write(&root, "f1", b"abc");
    write(&root, "sub/f2", b"de");

    let outcome = build(&builder_for(&quiet_config()), &root, &DeleteQueue::new());
    let tree = outcome.root;

    assert_eq!(tree.kind, EntryKind::Directory);
    assert!(tree.id.starts_with('x'));
    assert!(tree.hashes.is_none());
    let names: Vec<_> = tree.children().iter().map(|c| c.name.text.as_str()).collect();
    assert_eq!(names, vec!["f1", "sub"]);

    let f1 = &tree.children()[0];
    let expected = hash_bytes(b"abc", &HashAlgorithm::MANDATORY);
    assert_eq!(
        f1.id,
        format!("y{}", expected.get(HashAlgorithm::Sha256).unwrap())
    );
    let sub = &tree.children()[1];
    assert_eq!(sub.children()[0].name.text, "f2");
    assert_eq!(tree.counts().files, 2);
    assert_eq!(tree.counts().directories, 2);
}

#[test]
fn directory_size_is_sum_of_children() {
    let (_temp, root) = workspace();
    write(&root, "a", vec![0u8; 1000]);
    write(&root, "b/c", vec![1u8; 300]);
    write(&root, "b/d/e", vec![2u8; 24]);

    let tree = build(&builder_for(&quiet_config()), &root, &DeleteQueue::new()).root;
    assert_eq!(tree.size.bytes, 1324);
    let b = &tree.children()[1];
    assert_eq!(b.size.bytes, 324);
    assert_eq!(tree.size.text, "1.29 KiB");
}

#[test]
fn identities_are_stable_across_runs() {
    let (_temp, root) = workspace();
    write(&root, "x.bin", b"payload");
    write(&root, "nested/y.bin", b"other");

    let builder = builder_for(&quiet_config());
    let first = build(&builder, &root, &DeleteQueue::new()).root;
    let second = build(&builder, &root, &DeleteQueue::new()).root;
    assert_eq!(first.id, second.id);
    let ids = |e: &fsdex::Entry| -> Vec<String> {
        let mut out = Vec::new();
        e.walk(&mut |entry| out.push(entry.id.clone()));
        out
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn directory_identity_depends_on_parent_name() {
    let (temp, root) = workspace();
    write(&root, "inner/f", b"same");
    let builder = builder_for(&quiet_config());
    let before = build(&builder, &root, &DeleteQueue::new()).root;

    let moved = temp.path().join("elsewhere");
    fs::rename(&root, &moved).unwrap();
    let after = build(&builder, &moved, &DeleteQueue::new()).root;

    let inner_before = &before.children()[0];
    let inner_after = &after.children()[0];
    assert_ne!(inner_before.id, inner_after.id);
    // File identity is content only.
    assert_eq!(inner_before.children()[0].id, inner_after.children()[0].id);
}

#[test]
fn exclusions_ignore_case() {
    let (_temp, root) = workspace();
    write(&root, "keep.txt", b"k");
    write(&root, ".ds_store", b"junk");
    write(&root, "THUMBS.DB", b"junk");
    write(&root, "scratch.TMP", b"junk");

    let mut config = quiet_config();
    config.exclusions.globs.push("*.tmp".to_string());
    let tree = build(&builder_for(&config), &root, &DeleteQueue::new()).root;

    let names: Vec<_> = tree.children().iter().map(|c| c.name.text.clone()).collect();
    assert_eq!(names, vec!["keep.txt".to_string()]);
}

#[test]
fn children_sort_case_insensitively_files_first() {
    let (_temp, root) = workspace();
    write(&root, "b.txt", b"b");
    write(&root, "A.txt", b"a");
    write(&root, "Zdir/f", b"z");
    write(&root, "adir/f", b"a");
    write(&root, "c.txt", b"c");

    let tree = build(&builder_for(&quiet_config()), &root, &DeleteQueue::new()).root;
    let names: Vec<_> = tree.children().iter().map(|c| c.name.text.as_str()).collect();
    assert_eq!(names, vec!["A.txt", "b.txt", "c.txt", "adir", "Zdir"]);
}

#[test]
fn empty_file_carries_empty_digests() {
    let (_temp, root) = workspace();
    let path = write(&root, "empty", b"");

    let entry = build(&builder_for(&quiet_config()), &path, &DeleteQueue::new()).root;
    let hashes = entry.hashes.unwrap();
    assert_eq!(
        hashes.get(HashAlgorithm::Md5),
        Some("D41D8CD98F00B204E9800998ECF8427E")
    );
    assert_eq!(entry.size.bytes, 0);
    assert!(entry.extension.is_none());
}

#[test]
fn extra_algorithms_appear_in_every_set() {
    let (_temp, root) = workspace();
    let path = write(&root, "f.dat", b"data");

    let mut config = quiet_config();
    config.hashing.extra = vec![HashAlgorithm::Blake3, HashAlgorithm::Sha1];
    config.hashing.primary = HashAlgorithm::Blake3;
    let entry = build(&builder_for(&config), &path, &DeleteQueue::new()).root;

    let hashes = entry.hashes.as_ref().unwrap();
    assert_eq!(hashes.len(), 4);
    assert_eq!(entry.name.hashes.len(), 4);
    assert_eq!(entry.id_algorithm, HashAlgorithm::Blake3);
    assert_eq!(
        entry.id,
        format!("y{}", hashes.get(HashAlgorithm::Blake3).unwrap())
    );
}
