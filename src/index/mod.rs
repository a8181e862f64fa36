//! Class-metadata index collaborators and the index builder.
//!
//! The engine treats the index itself as opaque. It needs exactly two
//! collaborators:
//!
//! - an [`Indexer`] that accumulates class-file byte streams and produces an
//!   index value once [`complete`](Indexer::complete) is called, and
//! - an [`IndexWriter`] that turns that value into self-contained bytes.
//!
//! [`ClassSummaryIndexer`] and [`BinaryIndexWriter`] are the defaults used by
//! [`Engine::default`](crate::Engine::default). Any other pair can be plugged in
//! through [`Engine::new`](crate::Engine::new).
//!
//! # Example
//!
//! ```rust
//! use jarindex::index::{BinaryIndexWriter, ClassSummaryIndexer, IndexBuilder, IndexWriter};
//!
//! let mut builder = IndexBuilder::new(ClassSummaryIndexer::default());
//! // Not a class file name: skipped without reading.
//! assert!(!builder.add("META-INF/MANIFEST.MF", &mut std::io::empty()).unwrap());
//! let built = builder.finish();
//! assert_eq!(built.class_count, 0);
//!
//! let bytes = BinaryIndexWriter.write(&built.index).unwrap();
//! assert!(!bytes.is_empty());
//! ```

mod classfile;
mod format;

pub use classfile::{
    ClassParseError, ClassSummary, ClassSummaryIndex, ClassSummaryIndexer, parse_class_header,
};
pub use format::{BinaryIndexWriter, INDEX_MAGIC, INDEX_VERSION, read_index};

#[cfg(test)]
pub(crate) use classfile::class_bytes;

use std::io::Read;

use crate::Result;
use crate::archive::ArchiveHandle;
use crate::error::{BoxedIndexerError, Error};

/// File-name suffix selecting the entries fed to an [`Indexer`].
pub const CLASS_SUFFIX: &str = ".class";

/// Returns `true` if an entry with this name is fed to the [`Indexer`].
pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(CLASS_SUFFIX)
}

/// Accumulates class files into an index.
///
/// One indexer instance serves exactly one archive level. It must accept
/// zero inputs and still produce a valid, empty index.
pub trait Indexer {
    /// The finished index value.
    type Index;
    /// Error raised for a class file the indexer cannot process.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Consumes one class file.
    fn index(&mut self, class_file: &mut dyn Read) -> std::result::Result<(), Self::Error>;

    /// Finalizes the index.
    fn complete(self) -> Self::Index;
}

/// Creates a fresh [`Indexer`] for each archive level.
pub trait IndexerFactory {
    /// The indexer type produced.
    type Indexer: Indexer;

    /// Returns a new, empty indexer.
    fn create(&self) -> Self::Indexer;
}

impl<F, I> IndexerFactory for F
where
    F: Fn() -> I,
    I: Indexer,
{
    type Indexer = I;

    fn create(&self) -> I {
        self()
    }
}

/// Serializes a finished index.
///
/// Implementations must be deterministic: equal indices produce equal bytes.
pub trait IndexWriter<I> {
    /// Serializes `index`.
    fn write(&self, index: &I) -> Result<Vec<u8>>;
}

/// An index that was built and serialized for one archive level.
///
/// Beyond its existence and the number of classes that went into it, the
/// content is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexArtifact {
    class_count: usize,
    bytes: Vec<u8>,
}

impl IndexArtifact {
    /// Wraps serialized index bytes.
    pub fn new(class_count: usize, bytes: Vec<u8>) -> Self {
        Self { class_count, bytes }
    }

    /// Number of class files fed to the indexer.
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Serialized index bytes as produced by the [`IndexWriter`].
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the artifact, returning the serialized bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Result of [`IndexBuilder::finish`].
#[derive(Debug)]
pub struct BuiltIndex<I> {
    /// The finished index.
    pub index: I,
    /// Number of class entries consumed.
    pub class_count: usize,
}

/// Feeds class-file entries of one archive level into an [`Indexer`].
///
/// Entries whose name does not end in [`CLASS_SUFFIX`] are skipped without
/// being read.
#[derive(Debug)]
pub struct IndexBuilder<X> {
    indexer: X,
    class_count: usize,
}

impl<X: Indexer> IndexBuilder<X> {
    /// Creates a builder around a fresh indexer.
    pub fn new(indexer: X) -> Self {
        Self {
            indexer,
            class_count: 0,
        }
    }

    /// Returns `true` if an entry with this name is a class file.
    pub fn selects(name: &str) -> bool {
        is_class_entry(name)
    }

    /// Offers one entry to the builder.
    ///
    /// Returns `Ok(true)` if the entry was a class file and was indexed.
    pub fn add(&mut self, name: &str, content: &mut dyn Read) -> std::result::Result<bool, X::Error> {
        if !Self::selects(name) {
            return Ok(false);
        }
        self.indexer.index(content)?;
        self.class_count += 1;
        Ok(true)
    }

    /// Finalizes the index.
    pub fn finish(self) -> BuiltIndex<X::Index> {
        BuiltIndex {
            index: self.indexer.complete(),
            class_count: self.class_count,
        }
    }
}

/// Builds the index of one archive level.
///
/// Every regular entry whose name ends in `.class` is streamed into `indexer`
/// in native entry order.
pub fn build_index<R, X>(archive: &mut ArchiveHandle<R>, indexer: X) -> Result<BuiltIndex<X::Index>>
where
    R: Read + std::io::Seek,
    X: Indexer,
{
    let label = archive.label().to_string();
    let mut builder = IndexBuilder::new(indexer);
    archive.for_each_entry(
        |info| !info.is_directory && is_class_entry(&info.name),
        |info, content| {
            builder
                .add(&info.name, content)
                .map(|_| ())
                .map_err(|e| Error::Indexer {
                    archive: label.clone(),
                    entry: info.name.clone(),
                    source: Box::new(e) as BoxedIndexerError,
                })
        },
    )?;
    Ok(builder.finish())
}
