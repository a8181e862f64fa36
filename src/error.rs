//! Error types for archive indexing operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when indexing and repackaging archives, along with a
//! convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! There is no retry or partial-output policy: every error aborts the run
//! and nothing is written to the original artifact. Errors raised while
//! reading or writing a nested archive name the full nesting path of that
//! archive (for example `app.ear!/lib/b.jar`).
//!
//! ```rust,no_run
//! use jarindex::{Engine, Error};
//!
//! fn index(path: &str) -> jarindex::Result<()> {
//!     match Engine::default().index_artifact(path) {
//!         Ok(report) => {
//!             println!("changed: {}", report.outcome.changed());
//!             Ok(())
//!         }
//!         Err(Error::UnrecognizedArtifactType { name }) => {
//!             eprintln!("cannot tell what kind of archive '{}' is", name);
//!             Err(Error::UnrecognizedArtifactType { name })
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```

use std::io;

/// Boxed error raised by an external [`Indexer`](crate::index::Indexer).
pub type BoxedIndexerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for archive indexing operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Classification | [`UnrecognizedArtifactType`][Self::UnrecognizedArtifactType], [`UnsupportedContainerKind`][Self::UnsupportedContainerKind] | Unexpected file names |
/// | Archive I/O | [`ArchiveRead`][Self::ArchiveRead], [`ArchiveWrite`][Self::ArchiveWrite] | Corrupt zip data, disk full |
/// | Scratch | [`ScratchResource`][Self::ScratchResource] | Temporary storage unavailable |
/// | Collaborators | [`Indexer`][Self::Indexer], [`InvalidIndex`][Self::InvalidIndex] | Malformed class files or index data |
/// | Rewriting | [`EntryNotFound`][Self::EntryNotFound], [`EntryExists`][Self::EntryExists] | Inconsistent replacement plan |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred outside of any particular archive.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file name has no extension, so its archive type cannot be determined.
    ///
    /// This is also returned for extensions that map to no known archive
    /// type at all. The whole run is aborted.
    #[error("could not determine type of artifact: {name}")]
    UnrecognizedArtifactType {
        /// The offending file or entry name.
        name: String,
    },

    /// An extension has no sub-archive search rule although a search was required.
    #[error("unknown deployment container '{extension}': {name}")]
    UnsupportedContainerKind {
        /// The archive whose sub-archives were being located.
        name: String,
        /// The extension that has no search rule.
        extension: String,
    },

    /// Reading an archive failed.
    ///
    /// Covers corrupt central directories, truncated entries and unreadable
    /// files. The known wrong-size quirk handled by
    /// [`CorruptEntryNormalizer`](crate::normalize::CorruptEntryNormalizer)
    /// never surfaces as this error.
    #[error("could not read archive {archive}: {source}")]
    ArchiveRead {
        /// Nesting path of the archive that failed.
        archive: String,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Writing a rewritten archive failed.
    #[error("could not write archive {archive}: {source}")]
    ArchiveWrite {
        /// Nesting path of the archive being rewritten.
        archive: String,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Creating, filling or removing temporary scratch storage failed.
    #[error("scratch storage failure while {context}: {source}")]
    ScratchResource {
        /// What the scratch storage was being used for.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The index collaborator rejected a class file.
    #[error("could not index {entry} in {archive}: {source}")]
    Indexer {
        /// Nesting path of the archive holding the class file.
        archive: String,
        /// Entry name of the class file.
        entry: String,
        /// The collaborator's error.
        #[source]
        source: BoxedIndexerError,
    },

    /// Serialized index data is malformed.
    #[error("invalid index data: {0}")]
    InvalidIndex(String),

    /// A replacement was requested for an entry the archive does not contain.
    #[error("entry not found in {archive}: {path}")]
    EntryNotFound {
        /// Nesting path of the archive.
        archive: String,
        /// The missing entry name.
        path: String,
    },

    /// An appended entry would collide with an existing one.
    #[error("entry already exists in {archive}: {path}")]
    EntryExists {
        /// Nesting path of the archive.
        archive: String,
        /// The colliding entry name.
        path: String,
    },

    /// The artifact to index does not exist.
    #[error("artifact {path} does not exist, run package first")]
    ArtifactNotFound {
        /// The path that was requested.
        path: String,
    },
}

impl Error {
    /// Returns `true` if the error stems from how an artifact or entry is named.
    ///
    /// These errors are configuration problems: re-running with the same
    /// input always fails the same way.
    pub fn is_classification_error(&self) -> bool {
        matches!(
            self,
            Error::UnrecognizedArtifactType { .. } | Error::UnsupportedContainerKind { .. }
        )
    }

    /// Returns `true` if the error originates from the file system.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) | Error::ScratchResource { .. } | Error::ArtifactNotFound { .. } => true,
            Error::ArchiveRead { source, .. } | Error::ArchiveWrite { source, .. } => {
                matches!(source, zip::result::ZipError::Io(_))
            }
            _ => false,
        }
    }

    /// Returns `true` if the error indicates damaged archive or index content.
    pub fn is_corrupt_data(&self) -> bool {
        match self {
            Error::InvalidIndex(_) | Error::Indexer { .. } => true,
            Error::ArchiveRead { source, .. } => !matches!(source, zip::result::ZipError::Io(_)),
            _ => false,
        }
    }

    pub(crate) fn read(archive: &str, source: impl Into<zip::result::ZipError>) -> Self {
        Error::ArchiveRead {
            archive: archive.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn write(archive: &str, source: impl Into<zip::result::ZipError>) -> Self {
        Error::ArchiveWrite {
            archive: archive.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn scratch(context: impl Into<String>, source: io::Error) -> Self {
        Error::ScratchResource {
            context: context.into(),
            source,
        }
    }
}

/// A specialized Result type for archive indexing operations.
pub type Result<T> = std::result::Result<T, Error>;
