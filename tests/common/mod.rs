//! Shared test utilities for integration tests.
//!
//! Archives are built in memory with the `zip` writer; class files are the
//! smallest headers the default indexer accepts.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry name of an in-archive index.
pub const INDEX: &str = "META-INF/jandex.idx";

/// Content of the manifest written into test jars.
pub const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\nCreated-By: test\r\n";

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;

/// Builds a minimal class file declaring `name` with `java/lang/Object` as super class.
pub fn class_file(name: &str) -> Vec<u8> {
    class_file_with_strings(name, &[])
}

/// Like [`class_file`], with extra raw `CONSTANT_Utf8` entries after the class constants.
pub fn class_file_with_strings(name: &str, strings: &[&[u8]]) -> Vec<u8> {
    let utf8 = |s: &[u8]| {
        let mut out = vec![1u8];
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s);
        out
    };

    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // minor
    out.extend_from_slice(&61u16.to_be_bytes()); // major
    out.extend_from_slice(&(5 + strings.len() as u16).to_be_bytes());
    out.extend_from_slice(&utf8(name.as_bytes())); // #1
    out.extend_from_slice(&[7, 0, 1]); // #2 Class -> #1
    out.extend_from_slice(&utf8(b"java/lang/Object")); // #3
    out.extend_from_slice(&[7, 0, 3]); // #4 Class -> #3
    for s in strings {
        out.extend_from_slice(&utf8(s));
    }
    out.extend_from_slice(&0x0021u16.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes()); // this
    out.extend_from_slice(&4u16.to_be_bytes()); // super
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]); // fields, methods, attributes
    out
}

/// Creates an in-memory zip archive with deflated entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_bytes_with(entries, CompressionMethod::Deflated)
}

/// Creates an in-memory zip archive with every entry stored with `method`.
pub fn zip_bytes_with(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(method);
        for (name, data) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(name.to_string(), options)
                    .expect("Failed to add directory");
            } else {
                writer
                    .start_file(name.to_string(), options)
                    .expect("Failed to start entry");
                writer.write_all(data).expect("Failed to write entry");
            }
        }
        writer.finish().expect("Failed to finish archive");
    }
    cursor.into_inner()
}

/// A jar holding one class per name, without an index.
pub fn jar_with_classes(classes: &[&str]) -> Vec<u8> {
    let files: Vec<(String, Vec<u8>)> = classes
        .iter()
        .map(|c| (format!("{c}.class"), class_file(c)))
        .collect();
    let mut entries: Vec<(&str, &[u8])> = vec![("META-INF/MANIFEST.MF", MANIFEST)];
    entries.extend(files.iter().map(|(n, d)| (n.as_str(), d.as_slice())));
    zip_bytes(&entries)
}

/// A jar that already carries an index.
pub fn indexed_jar(class: &str) -> Vec<u8> {
    let class_name = format!("{class}.class");
    let class = class_file(class);
    zip_bytes(&[
        ("META-INF/MANIFEST.MF", MANIFEST),
        (INDEX, b"existing index"),
        (class_name.as_str(), &class),
    ])
}

/// The `app.ear` layout: an indexed `a.war` at the root and an unindexed `lib/b.jar`.
pub fn sample_ear() -> Vec<u8> {
    let war = zip_bytes(&[
        (INDEX, b"war index"),
        ("WEB-INF/web.xml", b"<web-app/>"),
    ]);
    let jar = jar_with_classes(&["com/X"]);
    zip_bytes(&[
        ("META-INF/application.xml", b"<application/>"),
        ("a.war", &war),
        ("lib/b.jar", &jar),
    ])
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("Failed to write file");
    path
}

/// Opens an in-memory archive.
pub fn open(bytes: &[u8]) -> ZipArchive<Cursor<&[u8]>> {
    ZipArchive::new(Cursor::new(bytes)).expect("Failed to open archive")
}

/// Lists entry names in native order.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = open(bytes);
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Reads one decompressed entry.
pub fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = open(bytes);
    let mut file = archive.by_name(name).expect("Entry not found");
    let mut data = Vec::new();
    file.read_to_end(&mut data).expect("Failed to read entry");
    data
}

/// Metadata and raw compressed bytes of an entry.
#[derive(Debug, PartialEq)]
pub struct RawEntry {
    pub name: String,
    pub method: CompressionMethod,
    pub crc32: u32,
    pub size: u64,
    pub compressed_size: u64,
    pub modified: Option<zip::DateTime>,
    pub data: Vec<u8>,
}

/// Reads an entry without decompressing it.
pub fn raw_entry(bytes: &[u8], name: &str) -> RawEntry {
    let mut archive = open(bytes);
    let index = archive.index_for_name(name).expect("Entry not found");
    let mut file = archive.by_index_raw(index).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    RawEntry {
        name: file.name().to_string(),
        method: file.compression(),
        crc32: file.crc32(),
        size: file.size(),
        compressed_size: file.compressed_size(),
        modified: file.last_modified(),
        data,
    }
}

/// Overwrites the declared uncompressed size of `entry` in both its local
/// and central directory headers.
pub fn patch_declared_size(bytes: &mut [u8], entry: &str, size: u32) {
    let name = entry.as_bytes();
    let mut patched = 0;
    let mut i = 0;
    while i + 4 <= bytes.len() {
        let signature = u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let (name_len_at, name_at, size_at) = match signature {
            LOCAL_HEADER_SIGNATURE => (i + 26, i + 30, i + 22),
            CENTRAL_HEADER_SIGNATURE => (i + 28, i + 46, i + 24),
            _ => {
                i += 1;
                continue;
            }
        };
        if name_at + name.len() <= bytes.len() {
            let name_len = u16::from_le_bytes([bytes[name_len_at], bytes[name_len_at + 1]]) as usize;
            if name_len == name.len() && &bytes[name_at..name_at + name.len()] == name {
                bytes[size_at..size_at + 4].copy_from_slice(&size.to_le_bytes());
                patched += 1;
            }
        }
        i += 1;
    }
    assert_eq!(patched, 2, "expected one local and one central header for {entry}");
}
