//! Archive rewriting.
//!
//! This module produces a new copy of an archive level that differs from the
//! original only where it must:
//! - entries whose nested archive changed are replaced in place,
//! - index entries are appended after all original entries,
//! - entries with a known wrong declared size are re-encoded with the measured size.
//!
//! Everything else is copied verbatim, including the compressed data, so
//! untouched entries are byte-identical in the output.
//!
//! # Implementation Notes
//!
//! The rewriter works by:
//! 1. Queueing all requested replacements and appends
//! 2. When `apply()` is called, iterating through the original archive in native order
//! 3. Copying unchanged entries raw (no decompression)
//! 4. Re-encoding replaced and repaired entries with the original entry's metadata
//! 5. Appending new entries in the order they were queued

mod operation;
mod rewriter;

pub use operation::{Content, Operation, ReplacementMap};
pub use rewriter::{ArchiveRewriter, RewriteResult};

use std::io::{Read, Seek, Write};

use zip::CompressionMethod;

use crate::Result;
use crate::archive::ArchiveHandle;
use crate::normalize::CorruptEntryNormalizer;

/// Rewrites `original` into `output` in one call.
///
/// `new_entries` are appended in the order given, each holding serialized
/// index bytes compressed with `append_method`.
pub fn rewrite_archive<R, W>(
    original: &mut ArchiveHandle<R>,
    replacements: ReplacementMap,
    new_entries: Vec<(String, Vec<u8>)>,
    normalizer: &CorruptEntryNormalizer,
    append_method: CompressionMethod,
    output: W,
) -> Result<RewriteResult>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut rewriter = ArchiveRewriter::new(original)
        .with_normalizer(normalizer)
        .with_append_compression(append_method);
    rewriter.replace_all(replacements)?;
    for (name, bytes) in new_entries {
        rewriter.append(&name, bytes)?;
    }
    rewriter.apply(output)
}
