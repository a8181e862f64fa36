//! Pending rewrite operations.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

/// Byte source of a replaced or appended entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// In-memory bytes, typically a serialized index.
    Bytes(Vec<u8>),
    /// A file on disk, typically a rewritten nested archive in scratch storage.
    File(PathBuf),
}

impl Content {
    /// Returns the number of bytes this content will produce.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Content::Bytes(data) => Ok(data.len() as u64),
            Content::File(path) => Ok(std::fs::metadata(path)?.len()),
        }
    }

    /// Returns `true` if the content is empty.
    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Streams the content into `sink`, returning the number of bytes copied.
    pub fn copy_to<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<u64> {
        match self {
            Content::Bytes(data) => {
                sink.write_all(data)?;
                Ok(data.len() as u64)
            }
            Content::File(path) => {
                let mut reader = BufReader::new(File::open(path)?);
                io::copy(&mut reader, sink)
            }
        }
    }
}

impl From<Vec<u8>> for Content {
    fn from(data: Vec<u8>) -> Self {
        Content::Bytes(data)
    }
}

impl From<PathBuf> for Content {
    fn from(path: PathBuf) -> Self {
        Content::File(path)
    }
}

/// Entry name to replacement source, built from changed children.
///
/// Keys must name entries of the archive being rewritten.
pub type ReplacementMap = HashMap<String, Content>;

/// A pending modification of an archive.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Replace the content of an existing entry, keeping its position.
    Replace {
        /// Entry name.
        name: String,
        /// New content.
        content: Content,
    },
    /// Add a new entry after all original entries.
    Append {
        /// Entry name.
        name: String,
        /// Entry content.
        content: Content,
    },
}

impl Operation {
    /// Returns the entry name this operation targets.
    pub fn name(&self) -> &str {
        match self {
            Operation::Replace { name, .. } | Operation::Append { name, .. } => name,
        }
    }

    /// Returns the operation type as a string.
    pub fn operation_type(&self) -> &'static str {
        match self {
            Operation::Replace { .. } => "replace",
            Operation::Append { .. } => "append",
        }
    }
}
