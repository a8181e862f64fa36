//! Fuzz target for opening arbitrary bytes as a WAR.
//!
//! WAR is the only type that is both indexed and searched, so every read
//! path of one archive level is exercised, followed by a dry-run descent
//! into whatever nested archives the bytes claim to hold.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use jarindex::archive::ArchiveHandle;
use jarindex::descend::Coordinator;
use jarindex::index::{BinaryIndexWriter, ClassSummaryIndexer, build_index};
use jarindex::scratch::Scratch;
use jarindex::{ArchiveType, IndexOptions, NoProgress, find_sub_archives};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let Ok(mut archive) = ArchiveHandle::new(Cursor::new(data), "fuzz.war") else {
        return;
    };

    for entry in archive.entries() {
        let _ = entry.name.as_str();
        let _ = entry.size;
        let _ = entry.is_directory;
    }

    // We don't care about the result - we're looking for panics or hangs
    let _ = find_sub_archives(&ArchiveType::War, &archive);
    let _ = build_index(&mut archive, ClassSummaryIndexer::default());

    let factory = ClassSummaryIndexer::default;
    let options = IndexOptions::new().dry_run(true);
    let coordinator = Coordinator::new(&factory, &BinaryIndexWriter, &options);
    let mut scratch = Scratch::default();
    let _ = coordinator.descend(
        "fuzz.war",
        Cursor::new(data),
        false,
        &mut scratch,
        &mut NoProgress,
    );
});
