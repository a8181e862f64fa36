//! Recursive descent integration tests.
//!
//! These tests drive the engine over artifacts on disk and check the outcome
//! tree and the rewritten bytes.

use std::fs;

use jarindex::{Engine, Error, IndexOptions, IndexStatus, StatisticsProgress, read_index};
use tempfile::TempDir;

mod common;

use common::{INDEX, entry_names, read_entry, sample_ear, write_file, zip_bytes};

// =============================================================================
// Container Scenario
// =============================================================================

#[test]
fn test_ear_with_unindexed_library() {
    let dir = TempDir::new().unwrap();
    let original = sample_ear();
    let path = write_file(dir.path(), "app.ear", &original);

    let report = Engine::default().index_artifact(&path).unwrap();
    assert!(report.changed());
    assert_eq!(report.written, vec![path.clone()]);

    // Outcome tree
    let outcome = &report.outcome;
    assert_eq!(outcome.name(), "app.ear");
    assert_eq!(outcome.index(), &IndexStatus::NotApplicable);
    let children = outcome.children();
    assert_eq!(children.len(), 2);

    assert_eq!(children[0].entry, "a.war");
    assert!(!children[0].replaced);
    assert!(!children[0].outcome.changed());
    assert_eq!(children[0].outcome.index(), &IndexStatus::AlreadyIndexed);

    assert_eq!(children[1].entry, "lib/b.jar");
    assert!(children[1].replaced);
    assert!(children[1].outcome.changed());
    assert_eq!(children[1].outcome.name(), "app.ear!/lib/b.jar");
    assert_eq!(children[1].outcome.index().class_count(), Some(1));
    assert!(outcome.is_consistent());

    // Rewritten bytes
    let rewritten = fs::read(&path).unwrap();
    assert_eq!(
        entry_names(&rewritten),
        vec!["META-INF/application.xml", "a.war", "lib/b.jar"]
    );
    assert_eq!(
        read_entry(&rewritten, "a.war"),
        read_entry(&original, "a.war")
    );

    let jar = read_entry(&rewritten, "lib/b.jar");
    assert_eq!(
        entry_names(&jar),
        vec!["META-INF/MANIFEST.MF", "com/X.class", INDEX]
    );
    let index = read_index(&read_entry(&jar, INDEX)).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.classes()[0].name, "com/X");
    assert_eq!(
        index.classes()[0].super_name.as_deref(),
        Some("java/lang/Object")
    );
}

#[test]
fn test_already_indexed_jar_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let original = common::indexed_jar("com/A");
    let path = write_file(dir.path(), "plain.jar", &original);
    let modified = fs::metadata(&path).unwrap().modified().unwrap();

    let report = Engine::default().index_artifact(&path).unwrap();
    assert!(!report.changed());
    assert!(report.written.is_empty());
    assert_eq!(fs::read(&path).unwrap(), original);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_second_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "app.ear", &sample_ear());
    let engine = Engine::default();

    assert!(engine.index_artifact(&path).unwrap().changed());
    let after_first = fs::read(&path).unwrap();

    let second = engine.index_artifact(&path).unwrap();
    assert!(!second.changed());
    for (_, level) in second.outcome.walk() {
        assert!(!level.changed(), "{} changed on second run", level.name());
        assert!(!level.index().is_fresh());
    }
    assert_eq!(fs::read(&path).unwrap(), after_first);
}

#[test]
fn test_container_with_nothing_to_do_is_unchanged() {
    let dir = TempDir::new().unwrap();
    let ear = zip_bytes(&[
        ("META-INF/application.xml", b"<application/>"),
        ("lib/ok.jar", &common::indexed_jar("com/Ok")),
        ("docs/readme.txt", b"not an archive"),
    ]);
    let path = write_file(dir.path(), "app.ear", &ear);

    let report = Engine::default().index_artifact(&path).unwrap();
    assert!(!report.changed());
    assert!(report.written.is_empty());
    assert_eq!(report.outcome.children().len(), 1);
}

// =============================================================================
// Nesting
// =============================================================================

#[test]
fn test_war_inside_ear_is_indexed_at_every_level() {
    let dir = TempDir::new().unwrap();
    let inner = common::jar_with_classes(&["com/Inner"]);
    let war_class = common::class_file("com/Servlet");
    let war = zip_bytes(&[
        ("WEB-INF/web.xml", b"<web-app/>"),
        ("com/Servlet.class", &war_class),
        ("lib/inner.jar", &inner),
    ]);
    let ear = zip_bytes(&[("web.war", &war)]);
    let path = write_file(dir.path(), "app.ear", &ear);

    let mut progress = StatisticsProgress::new();
    let report = Engine::default()
        .index_artifact_with_progress(&path, &mut progress)
        .unwrap();

    let summary = report.outcome.summary();
    assert_eq!(summary.levels, 3);
    assert_eq!(summary.max_depth, 2);
    assert_eq!(summary.indices_built, 2);
    assert_eq!(summary.classes_indexed, 2);
    assert_eq!(progress.state().levels_visited, 3);
    assert_eq!(progress.state().indices_built, 2);
    assert_eq!(progress.state().archives_rewritten, 3);

    let rewritten = fs::read(&path).unwrap();
    let war = read_entry(&rewritten, "web.war");
    assert_eq!(
        entry_names(&war),
        vec!["WEB-INF/web.xml", "com/Servlet.class", "lib/inner.jar", INDEX]
    );
    let inner = read_entry(&war, "lib/inner.jar");
    assert_eq!(
        entry_names(&inner).last().map(String::as_str),
        Some(INDEX)
    );
}

#[test]
fn test_resource_adapter_inside_ear() {
    let dir = TempDir::new().unwrap();
    let rar = zip_bytes(&[
        ("META-INF/ra.xml", b"<connector/>"),
        ("connector.jar", &common::jar_with_classes(&["com/Conn", "com/Factory"])),
        ("lib/ignored.jar", &common::jar_with_classes(&["com/Ignored"])),
    ]);
    let ear = zip_bytes(&[("adapter.rar", &rar)]);
    let path = write_file(dir.path(), "app.ear", &ear);

    let report = Engine::default().index_artifact(&path).unwrap();
    let levels: Vec<(usize, String)> = report
        .outcome
        .walk()
        .map(|(depth, level)| (depth, level.name().to_string()))
        .collect();
    assert_eq!(
        levels,
        vec![
            (0, "app.ear".to_string()),
            (1, "app.ear!/adapter.rar".to_string()),
            (2, "app.ear!/adapter.rar!/connector.jar".to_string()),
        ]
    );

    let rewritten = fs::read(&path).unwrap();
    let rar = read_entry(&rewritten, "adapter.rar");
    let connector = read_entry(&rar, "connector.jar");
    let index = read_index(&read_entry(&connector, INDEX)).unwrap();
    assert_eq!(index.len(), 2);
    // Only root jars of a rar are searched
    let ignored = read_entry(&rar, "lib/ignored.jar");
    assert!(!entry_names(&ignored).contains(&INDEX.to_string()));
}

#[test]
fn test_corrupt_nested_archive_aborts() {
    let dir = TempDir::new().unwrap();
    let ear = zip_bytes(&[
        ("lib/a.jar", &common::jar_with_classes(&["com/A"])),
        ("lib/b.jar", b"definitely not a zip"),
    ]);
    let original = ear.clone();
    let path = write_file(dir.path(), "app.ear", &ear);

    let err = Engine::default().index_artifact(&path).unwrap_err();
    match err {
        Error::ArchiveRead { archive, .. } => assert_eq!(archive, "app.ear!/lib/b.jar"),
        e => panic!("Expected ArchiveRead, got: {:?}", e),
    }
    assert_eq!(fs::read(&path).unwrap(), original);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

fn scratch_engine(scratch: &TempDir) -> Engine {
    Engine::default().with_options(IndexOptions::new().scratch_dir(scratch.path()))
}

fn is_empty_dir(dir: &TempDir) -> bool {
    fs::read_dir(dir.path()).unwrap().next().is_none()
}

#[test]
fn test_scratch_released_after_success() {
    let dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let path = write_file(dir.path(), "app.ear", &sample_ear());

    let report = scratch_engine(&scratch).index_artifact(&path).unwrap();
    assert!(report.changed());
    assert!(is_empty_dir(&scratch));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_scratch_released_after_error() {
    let dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let ear = zip_bytes(&[
        ("lib/a.jar", &common::jar_with_classes(&["com/A"])),
        ("lib/b.jar", b"definitely not a zip"),
    ]);
    let path = write_file(dir.path(), "app.ear", &ear);

    let err = scratch_engine(&scratch).index_artifact(&path).unwrap_err();
    assert!(matches!(err, Error::ArchiveRead { .. }));
    assert!(is_empty_dir(&scratch));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_class_with_modified_utf8_constants() {
    let dir = TempDir::new().unwrap();
    // "a\0b" and U+1F600 in the constant pool, encoded the way javac does
    let class = common::class_file_with_strings(
        "com/Z",
        &[&b"a\xC0\x80b"[..], &b"\xED\xA0\xBD\xED\xB8\x80"[..]],
    );
    let path = write_file(dir.path(), "z.jar", &zip_bytes(&[("com/Z.class", &class)]));

    let report = Engine::default().index_artifact(&path).unwrap();
    assert_eq!(report.outcome.index().class_count(), Some(1));
    let index = read_index(&read_entry(&fs::read(&path).unwrap(), INDEX)).unwrap();
    assert_eq!(index.classes()[0].name, "com/Z");
}

#[test]
fn test_malformed_class_names_entry() {
    let dir = TempDir::new().unwrap();
    let jar = zip_bytes(&[("com/Broken.class", b"\xCA\xFE")]);
    let path = write_file(dir.path(), "broken.jar", &jar);

    let err = Engine::default().index_artifact(&path).unwrap_err();
    match err {
        Error::Indexer { archive, entry, .. } => {
            assert_eq!(archive, "broken.jar");
            assert_eq!(entry, "com/Broken.class");
        }
        e => panic!("Expected Indexer, got: {:?}", e),
    }
    assert_eq!(fs::read(&path).unwrap(), jar);
}
