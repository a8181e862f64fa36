//! Placement, output target and driver mode tests.

use std::fs;

use jarindex::{
    Engine, Error, IndexOptions, IndexPlacement, IndexStatus, OutputTarget, read_index,
};
use tempfile::TempDir;

mod common;

use common::{INDEX, entry_names, indexed_jar, jar_with_classes, read_entry, sample_ear, write_file};

fn sibling_engine() -> Engine {
    Engine::default().with_options(IndexOptions::new().placement(IndexPlacement::Sibling))
}

fn dir_listing(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Sibling Placement
// =============================================================================

#[test]
fn test_sibling_index_for_top_level_jar() {
    let dir = TempDir::new().unwrap();
    let original = jar_with_classes(&["com/A", "com/B"]);
    let path = write_file(dir.path(), "lib.jar", &original);

    let report = sibling_engine().index_artifact(&path).unwrap();
    assert!(report.changed());
    assert_eq!(report.written, vec![dir.path().join("lib.jar.index")]);

    // The jar itself is untouched
    assert_eq!(fs::read(&path).unwrap(), original);
    let index = read_index(&fs::read(dir.path().join("lib.jar.index")).unwrap()).unwrap();
    assert_eq!(index.len(), 2);

    // An existing sibling counts as an index
    let second = sibling_engine().index_artifact(&path).unwrap();
    assert!(!second.changed());
    assert_eq!(second.outcome.index(), &IndexStatus::AlreadyIndexed);
}

#[test]
fn test_sibling_index_for_nested_jar() {
    let dir = TempDir::new().unwrap();
    let original = sample_ear();
    let path = write_file(dir.path(), "app.ear", &original);

    let report = sibling_engine().index_artifact(&path).unwrap();
    assert!(report.changed());
    let child = &report.outcome.children()[1];
    assert_eq!(child.entry, "lib/b.jar");
    assert!(!child.replaced);
    assert_eq!(child.sibling_index.as_deref(), Some("lib/b.jar.index"));

    let rewritten = fs::read(&path).unwrap();
    assert_eq!(
        entry_names(&rewritten),
        vec![
            "META-INF/application.xml",
            "a.war",
            "lib/b.jar",
            "lib/b.jar.index"
        ]
    );
    assert_eq!(
        read_entry(&rewritten, "lib/b.jar"),
        read_entry(&original, "lib/b.jar")
    );
    let index = read_index(&read_entry(&rewritten, "lib/b.jar.index")).unwrap();
    assert_eq!(index.classes()[0].name, "com/X");
    assert_eq!(dir_listing(&dir), vec!["app.ear"]);

    let second = sibling_engine().index_artifact(&path).unwrap();
    assert!(!second.changed());
}

// =============================================================================
// Output Target
// =============================================================================

#[test]
fn test_repackage_leaves_input_untouched() {
    let dir = TempDir::new().unwrap();
    let original = sample_ear();
    let path = write_file(dir.path(), "app.ear", &original);

    let engine = Engine::default().with_options(IndexOptions::new().target(OutputTarget::repackage()));
    let report = engine.index_artifact(&path).unwrap();

    let repackaged = dir.path().join("app-indexed.ear");
    assert_eq!(report.written, vec![repackaged.clone()]);
    assert_eq!(fs::read(&path).unwrap(), original);
    let jar = read_entry(&fs::read(&repackaged).unwrap(), "lib/b.jar");
    assert!(entry_names(&jar).contains(&INDEX.to_string()));
}

#[test]
fn test_repackage_skipped_when_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "plain.jar", &indexed_jar("com/A"));

    let engine = Engine::default().with_options(IndexOptions::new().target(OutputTarget::Repackage {
        suffix: "-idx".to_string(),
    }));
    let report = engine.index_artifact(&path).unwrap();
    assert!(!report.changed());
    assert_eq!(dir_listing(&dir), vec!["plain.jar"]);
}

#[test]
fn test_repackage_with_sibling_placement() {
    let dir = TempDir::new().unwrap();
    let original = jar_with_classes(&["com/A"]);
    let path = write_file(dir.path(), "lib.jar", &original);

    let options = IndexOptions::new()
        .placement(IndexPlacement::Sibling)
        .target(OutputTarget::repackage());
    let report = Engine::default()
        .with_options(options)
        .index_artifact(&path)
        .unwrap();

    assert_eq!(
        dir_listing(&dir),
        vec!["lib-indexed.jar", "lib-indexed.jar.index", "lib.jar"]
    );
    assert_eq!(report.written.len(), 2);
    assert_eq!(fs::read(dir.path().join("lib-indexed.jar")).unwrap(), original);
}

// =============================================================================
// Driver Modes
// =============================================================================

#[test]
fn test_index_folder() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "b.jar", &jar_with_classes(&["com/B"]));
    write_file(dir.path(), "a.jar", &jar_with_classes(&["com/A"]));
    write_file(dir.path(), "done.jar", &indexed_jar("com/Done"));
    write_file(dir.path(), "notes.txt", b"ignored");
    fs::create_dir(dir.path().join("sub.jar")).unwrap();

    let reports = Engine::default().index_folder(dir.path()).unwrap();
    let names: Vec<_> = reports
        .iter()
        .map(|r| r.artifact.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.jar", "b.jar", "done.jar"]);
    assert!(reports[0].changed());
    assert!(reports[1].changed());
    assert!(!reports[2].changed());

    assert_eq!(
        dir_listing(&dir),
        vec![
            "a.jar",
            "a.jar.index",
            "b.jar",
            "b.jar.index",
            "done.jar",
            "notes.txt",
            "sub.jar"
        ]
    );
}

#[test]
fn test_index_folder_requires_directory() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "a.jar", &jar_with_classes(&["com/A"]));
    assert!(matches!(
        Engine::default().index_folder(&file),
        Err(Error::ArtifactNotFound { .. })
    ));
}

#[test]
fn test_inspect_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let original = sample_ear();
    let path = write_file(dir.path(), "app.ear", &original);

    let outcome = Engine::default().inspect(&path).unwrap();
    assert!(outcome.changed());
    let jar = &outcome.children()[1].outcome;
    assert_eq!(jar.index(), &IndexStatus::Pending { class_entries: 1 });
    let summary = outcome.summary();
    assert_eq!(summary.indices_pending, 1);
    assert_eq!(summary.already_indexed, 1);

    assert_eq!(fs::read(&path).unwrap(), original);
    assert_eq!(dir_listing(&dir), vec!["app.ear"]);
}

#[test]
fn test_skip() {
    let dir = TempDir::new().unwrap();
    let original = jar_with_classes(&["com/A"]);
    let path = write_file(dir.path(), "lib.jar", &original);

    let report = Engine::default()
        .with_options(IndexOptions::new().skip(true))
        .index_artifact(&path)
        .unwrap();
    assert!(!report.changed());
    assert!(report.outcome.children().is_empty());
    assert_eq!(fs::read(&path).unwrap(), original);
}

#[test]
fn test_missing_artifact() {
    let dir = TempDir::new().unwrap();
    let err = Engine::default()
        .index_artifact(dir.path().join("missing.ear"))
        .unwrap_err();
    assert!(matches!(err, Error::ArtifactNotFound { .. }));
    assert!(err.is_io_error());
}

#[test]
fn test_unrecognized_artifact_name() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "Makefile", b"all:");
    let err = Engine::default().index_artifact(&path).unwrap_err();
    assert!(matches!(err, Error::UnrecognizedArtifactType { .. }));
    assert!(err.is_classification_error());
}

#[test]
fn test_index_all_stops_at_first_error() {
    let dir = TempDir::new().unwrap();
    let first = write_file(dir.path(), "a.jar", &jar_with_classes(&["com/A"]));
    let missing = dir.path().join("missing.jar");
    let third = write_file(dir.path(), "c.jar", &jar_with_classes(&["com/C"]));
    let untouched = fs::read(&third).unwrap();

    let err = Engine::default()
        .index_all([&first, &missing, &third])
        .unwrap_err();
    assert!(matches!(err, Error::ArtifactNotFound { .. }));
    assert!(entry_names(&fs::read(&first).unwrap()).contains(&INDEX.to_string()));
    assert_eq!(fs::read(&third).unwrap(), untouched);
}
