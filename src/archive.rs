//! Read access to one zip-structured archive level.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::Path;

use zip::{CompressionMethod, ZipArchive};

use crate::{Error, Result};

/// Conventional in-archive location of a class-metadata index.
pub const INDEX_ENTRY: &str = "META-INF/jandex.idx";

/// Suffix appended to an archive name to form its sibling index name.
pub const SIBLING_INDEX_SUFFIX: &str = ".index";

/// Returns the sibling index name for an archive file or entry name.
///
/// ```rust
/// assert_eq!(jarindex::archive::sibling_index_name("lib/b.jar"), "lib/b.jar.index");
/// ```
pub fn sibling_index_name(name: &str) -> String {
    format!("{name}{SIBLING_INDEX_SUFFIX}")
}

/// Metadata of one archive entry, captured when the archive is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Position in the central directory.
    pub index: usize,
    /// Entry name as stored.
    pub name: String,
    /// Declared uncompressed size.
    pub size: u64,
    /// Declared compressed size.
    pub compressed_size: u64,
    /// Compression method.
    pub method: CompressionMethod,
    /// Whether the entry is a directory.
    pub is_directory: bool,
}

/// An opened, randomly addressable zip archive.
///
/// The handle keeps the entry list in native central-directory order and
/// carries a label (the nesting path of the archive) that is attached to every
/// error it reports. It is dropped, and the underlying reader closed, when the
/// recursion level that opened it finishes.
pub struct ArchiveHandle<R> {
    label: String,
    zip: ZipArchive<R>,
    entries: Vec<EntryInfo>,
    names: HashSet<String>,
}

impl ArchiveHandle<BufReader<File>> {
    /// Opens an archive file, labelling it with `label`.
    pub fn open_path(path: impl AsRef<Path>, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let file = File::open(path.as_ref()).map_err(|e| Error::read(&label, e))?;
        Self::new(BufReader::new(file), label)
    }
}

impl<R: Read + Seek> ArchiveHandle<R> {
    /// Opens an archive from a reader.
    pub fn new(reader: R, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let mut zip = ZipArchive::new(reader).map_err(|e| Error::read(&label, e))?;

        let mut entries = Vec::with_capacity(zip.len());
        let mut names = HashSet::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip.by_index_raw(index).map_err(|e| Error::read(&label, e))?;
            let info = EntryInfo {
                index,
                name: file.name().to_string(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                method: file.compression(),
                is_directory: file.is_dir(),
            };
            names.insert(info.name.clone());
            entries.push(info);
        }

        Ok(Self {
            label,
            zip,
            entries,
            names,
        })
    }

    /// Returns the nesting path used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns all entries in native order.
    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry with exactly this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns `true` if the archive already carries an index at `index_entry`.
    pub fn has_index(&self, index_entry: &str) -> bool {
        self.contains(index_entry)
    }

    /// Looks up an entry by name, returning the first match in native order.
    pub fn entry(&self, name: &str) -> Option<&EntryInfo> {
        if !self.contains(name) {
            return None;
        }
        self.entries.iter().find(|e| e.name == name)
    }

    /// Streams the decompressed content of an entry into `sink`.
    ///
    /// Returns the number of bytes actually produced, which may differ from
    /// the declared [`EntryInfo::size`] for damaged archives.
    pub fn copy_entry<W: Write>(&mut self, index: usize, sink: &mut W) -> Result<u64> {
        let label = &self.label;
        let mut file = self.zip.by_index(index).map_err(|e| Error::read(label, e))?;
        io::copy(&mut file, sink).map_err(|e| Error::read(label, e))
    }

    /// Reads the decompressed content of an entry into memory.
    pub fn read_entry(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.copy_entry(index, &mut data)?;
        Ok(data)
    }

    /// Calls `visit` with a streaming reader for every entry selected by `filter`.
    ///
    /// Entries are visited in native order. The closure's error aborts the walk.
    pub fn for_each_entry<F, V>(&mut self, mut filter: F, mut visit: V) -> Result<()>
    where
        F: FnMut(&EntryInfo) -> bool,
        V: FnMut(&EntryInfo, &mut dyn Read) -> Result<()>,
    {
        for info in &self.entries {
            if !filter(info) {
                continue;
            }
            let mut file = self
                .zip
                .by_index(info.index)
                .map_err(|e| Error::read(&self.label, e))?;
            visit(info, &mut file)?;
        }
        Ok(())
    }

    /// Returns mutable access to the underlying zip reader.
    pub(crate) fn zip_mut(&mut self) -> &mut ZipArchive<R> {
        &mut self.zip
    }
}

impl<R> std::fmt::Debug for ArchiveHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("label", &self.label)
            .field("entries", &self.entries.len())
            .finish()
    }
}
