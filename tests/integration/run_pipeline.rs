use crate::support::{quiet_config, workspace, write};
use fsdex::cancel::CancellationToken;
use fsdex::sink::{EntrySink, InPlaceSink, JsonFileSink, RecordingSink};
use fsdex::{BuildError, ConfigLoader, Entry, Indexer, RunError, SinkError};
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::Path;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn tree_file_is_written_before_sidecars_are_removed() {
    let (temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    let sidecar = write(&root, "a.txt_meta.json", br#"{"k":1}"#);

    let mut config = quiet_config();
    config.sidecar.merge = true;
    config.sidecar.delete = true;
    let out = temp.path().join("tree.json");
    let mut sink = JsonFileSink::new(&out, false);
    let report = Indexer::new(&config)
        .unwrap()
        .run(&root, &mut sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.queued_sidecars, 1);
    let drain = report.drain.unwrap();
    assert_eq!(drain.removed, vec![sidecar.clone()]);
    assert!(!sidecar.exists());

    let tree: Entry = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(tree.children().len(), 1);
    assert_eq!(tree.children()[0].metadata[0].value, json!({"k": 1}));
}

#[test]
fn inplace_records_sit_next_to_items() {
    let (temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    write(&root, "sub/b.txt", b"beta");

    let config = {
        let mut c = quiet_config();
        c.output.inplace = true;
        c
    };
    let mut sink = InPlaceSink::new(true);
    Indexer::new(&config)
        .unwrap()
        .run(&root, &mut sink, &CancellationToken::new())
        .unwrap();

    let file_record = read_json(&root.join("a.txt_meta.json"));
    assert_eq!(file_record["type"], "file");
    assert_eq!(file_record["name"]["text"], "a.txt");
    assert!(root.join("sub/b.txt_meta.json").exists());

    let dir_record = read_json(&root.join("sub_directorymeta.json"));
    assert_eq!(dir_record["type"], "directory");
    assert!(dir_record.get("items").is_none());
    assert!(temp.path().join("root_directorymeta.json").exists());
    assert_eq!(sink.written().len(), 4);
}

#[test]
fn inplace_rerun_without_merge_ignores_old_records() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    let mut config = quiet_config();
    config.output.inplace = true;
    let indexer = Indexer::new(&config).unwrap();

    indexer
        .run(&root, &mut InPlaceSink::new(true), &CancellationToken::new())
        .unwrap();
    let mut sink = RecordingSink::default();
    let report = indexer
        .run(&root, &mut sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.counts.files, 1);
    let names: Vec<_> = sink
        .root
        .unwrap()
        .children()
        .iter()
        .map(|c| c.name.text.clone())
        .collect();
    assert_eq!(names, vec!["a.txt".to_string()]);
}

#[test]
fn inplace_merge_keeps_rewritten_record() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    let record = write(&root, "a.txt_meta.json", br#"{"k":1}"#);
    let description = write(&root, "a.description", b"about a");

    let mut config = quiet_config();
    config.output.inplace = true;
    config.sidecar.merge = true;
    config.sidecar.delete = true;
    let report = Indexer::new(&config)
        .unwrap()
        .run(&root, &mut InPlaceSink::new(true), &CancellationToken::new())
        .unwrap();

    let drain = report.drain.unwrap();
    assert_eq!(drain.kept, vec![record.clone()]);
    assert_eq!(drain.removed, vec![description.clone()]);
    assert!(!description.exists());

    let rewritten = read_json(&record);
    assert_eq!(rewritten["name"]["text"], "a.txt");
    let metadata = rewritten["metadata"].as_array().unwrap();
    assert_eq!(metadata.len(), 2);
}

#[test]
fn rename_moves_files_to_their_identity() {
    let (_temp, root) = workspace();
    write(&root, "Photo.JPG", b"pixels");

    let mut config = quiet_config();
    config.rename.enabled = true;
    let mut sink = RecordingSink::default();
    let report = Indexer::new(&config)
        .unwrap()
        .run(&root, &mut sink, &CancellationToken::new())
        .unwrap();

    let id = sink.root.unwrap().children()[0].id.clone();
    let renamed = report.rename.unwrap();
    assert_eq!(renamed.renamed.len(), 1);
    assert!(root.join(format!("{}.jpg", id)).exists());
    assert!(!root.join("Photo.JPG").exists());
}

#[test]
fn rename_dry_run_only_plans() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"a");

    let mut config = quiet_config();
    config.rename.enabled = true;
    config.rename.dry_run = true;
    let report = Indexer::new(&config)
        .unwrap()
        .run(&root, &mut RecordingSink::default(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.rename.unwrap().planned.len(), 1);
    assert!(root.join("a.txt").exists());
}

#[test]
fn config_file_drives_the_run() {
    let (temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    write(&root, "deep/b.txt", b"beta");

    let config_path = temp.path().join("fsdex.toml");
    fs::write(
        &config_path,
        r#"
recursive = false

[hashing]
primary = "sha1"
extra = ["sha1"]

[extractor]
enabled = false
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_path).unwrap();
    let mut sink = RecordingSink::default();
    let report = Indexer::new(&config)
        .unwrap()
        .run(&root, &mut sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.id_algorithm, fsdex::HashAlgorithm::Sha1);
    assert!(sink.root.unwrap().items.is_none());
    assert_eq!(report.total_bytes, 0);
}

/// Accepts files, then fails on directories or on the finished tree.
struct FailingSink {
    fail_on_finish: bool,
}

fn disk_full(path: &Path) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::Other, "disk full"),
    }
}

impl EntrySink for FailingSink {
    fn accept(&mut self, path: &Path, entry: &Entry) -> Result<(), SinkError> {
        if entry.is_dir() && !self.fail_on_finish {
            return Err(disk_full(path));
        }
        Ok(())
    }

    fn finish(&mut self, root: &Entry) -> Result<(), SinkError> {
        if self.fail_on_finish {
            return Err(disk_full(Path::new(&root.name.text)));
        }
        Ok(())
    }
}

fn merge_and_delete() -> fsdex::IndexerConfig {
    let mut config = quiet_config();
    config.sidecar.merge = true;
    config.sidecar.delete = true;
    config
}

#[test]
fn sink_failure_during_build_keeps_sidecars() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    let sidecar = write(&root, "a.txt_meta.json", br#"{"k":1}"#);

    let err = Indexer::new(&merge_and_delete())
        .unwrap()
        .run(
            &root,
            &mut FailingSink {
                fail_on_finish: false,
            },
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(matches!(err, RunError::Build(BuildError::Sink(_))));
    assert!(sidecar.exists());
}

#[test]
fn sink_failure_on_finish_keeps_sidecars() {
    let (_temp, root) = workspace();
    write(&root, "a.txt", b"alpha");
    let sidecar = write(&root, "a.txt_meta.json", br#"{"k":1}"#);

    let err = Indexer::new(&merge_and_delete())
        .unwrap()
        .run(
            &root,
            &mut FailingSink {
                fail_on_finish: true,
            },
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(matches!(err, RunError::Sink(SinkError::Io { .. })));
    assert!(sidecar.exists());
}
