//! # jarindex
//!
//! Recursive class-metadata indexing for JAR-family archives.
//!
//! This crate adds a precomputed class index to compiled archive artifacts
//! (`.jar`) and to the deployment containers that nest them (`.war`, `.ear`,
//! `.rar`). Nested archives are extracted to scratch storage, indexed, and
//! spliced back into their parents, while every entry that does not need to
//! change is copied byte for byte.
//!
//! ## Quick Start
//!
//! ### Indexing an Artifact
//!
//! ```rust,no_run
//! use jarindex::{Engine, Result};
//!
//! fn main() -> Result<()> {
//!     let report = Engine::default().index_artifact("target/app.ear")?;
//!     if report.changed() {
//!         println!("indexed {}", report.artifact.display());
//!     } else {
//!         println!("already up to date");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Inspecting Without Writing
//!
//! ```rust,no_run
//! use jarindex::{Engine, Result};
//!
//! fn main() -> Result<()> {
//!     let outcome = Engine::default().inspect("target/app.ear")?;
//!     for (depth, level) in outcome.walk() {
//!         println!("{:indent$}{} [{}]", "", level.name(), level.index(), indent = depth * 2);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Plugging In Another Indexer
//!
//! Any [`Indexer`](index::Indexer) / [`IndexWriter`](index::IndexWriter) pair can
//! replace the defaults:
//!
//! ```rust
//! use jarindex::Engine;
//! use jarindex::index::{Indexer, IndexWriter};
//! use std::io::Read;
//!
//! #[derive(Default)]
//! struct CountingIndexer(u32);
//!
//! impl Indexer for CountingIndexer {
//!     type Index = u32;
//!     type Error = std::io::Error;
//!
//!     fn index(&mut self, class_file: &mut dyn Read) -> Result<(), std::io::Error> {
//!         std::io::copy(class_file, &mut std::io::sink())?;
//!         self.0 += 1;
//!         Ok(())
//!     }
//!
//!     fn complete(self) -> u32 {
//!         self.0
//!     }
//! }
//!
//! struct CountWriter;
//!
//! impl IndexWriter<u32> for CountWriter {
//!     fn write(&self, index: &u32) -> jarindex::Result<Vec<u8>> {
//!         Ok(index.to_be_bytes().to_vec())
//!     }
//! }
//!
//! let engine = Engine::new(CountingIndexer::default, CountWriter);
//! # let _ = engine;
//! ```
//!
//! ## Index Placement
//!
//! | Placement | Fresh index of `lib/b.jar` inside `app.ear` | Fresh index of top-level `x.jar` |
//! |-----------|---------------------------------------------|----------------------------------|
//! | [`Embedded`](IndexPlacement::Embedded) (default) | `META-INF/jandex.idx` inside `b.jar`, which is replaced in `app.ear` | `META-INF/jandex.idx` inside `x.jar` |
//! | [`Sibling`](IndexPlacement::Sibling) | entry `lib/b.jar.index` appended to `app.ear` | file `x.jar.index` |
//!
//! An archive that already carries `META-INF/jandex.idx` (or, with sibling
//! placement, whose sibling index exists) is never indexed again, so running
//! the engine twice leaves the artifact untouched the second time.
//!
//! ## Error Handling
//!
//! Every failure aborts the run and leaves the original artifact as it was.
//! See [`Error`] for the categories.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod archive;
pub mod descend;
pub mod engine;
pub mod error;
pub mod index;
pub mod kind;
pub mod locate;
pub mod normalize;
pub mod options;
pub mod outcome;
pub mod progress;
pub mod rewrite;
pub mod scratch;

pub use error::{Error, Result};

// Re-export the driver at crate root for convenience
pub use engine::{DefaultIndexerFactory, Engine, IndexReport};
pub use options::{IndexOptions, IndexPlacement, OutputTarget};

// Re-export classification and discovery
pub use kind::{ArchiveKind, ArchiveType, classify};
pub use locate::{SubArchiveRef, find_sub_archives};

// Re-export outcome API
pub use outcome::{ChildOutcome, IndexStatus, OutcomeSummary, RecursionOutcome};

// Re-export index collaborators
pub use index::{BinaryIndexWriter, ClassSummaryIndexer, IndexArtifact, read_index};

// Re-export progress API
pub use progress::{NoProgress, ProgressReporter, ProgressState, StatisticsProgress};

// Re-export rewrite API
pub use normalize::CorruptEntryNormalizer;
pub use rewrite::{ArchiveRewriter, ReplacementMap, RewriteResult};
