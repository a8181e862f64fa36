//! Archive rewriter producing a modified copy of one archive level.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::archive::{ArchiveHandle, EntryInfo};
use crate::normalize::{CorruptEntryNormalizer, Measurement};
use crate::{Error, Result};

use super::operation::{Content, Operation, ReplacementMap};

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Result of a rewrite.
#[must_use = "rewrite result should be checked to verify operation completed as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteResult {
    /// Entries copied verbatim, headers and compressed data untouched.
    pub entries_copied: usize,
    /// Entries whose content was replaced.
    pub entries_replaced: usize,
    /// Entries re-encoded because their declared size was wrong.
    pub entries_repaired: usize,
    /// Entries added after the original ones.
    pub entries_appended: usize,
    /// Uncompressed bytes written for replaced, repaired and appended entries.
    pub bytes_written: u64,
    /// Names of the repaired entries.
    pub repaired: Vec<String>,
}

impl RewriteResult {
    /// Returns the total number of entries in the resulting archive.
    pub fn total_entries(&self) -> usize {
        self.entries_copied + self.entries_replaced + self.entries_repaired + self.entries_appended
    }
}

/// Rewrites one archive level.
///
/// Operations are queued and only applied when [`apply`](Self::apply) is
/// called. The output contains every original entry in original order, then
/// the appended entries in the order they were queued:
///
/// - a replaced entry keeps its name, compression method, modification time
///   and permissions; its sizes and CRC are computed from the new content,
/// - an entry listed by the [`CorruptEntryNormalizer`] is decompressed and
///   measured; if its declared size is wrong it is re-encoded with the
///   measured size, otherwise it is copied verbatim,
/// - every other entry is copied verbatim without recompression.
///
/// # Example
///
/// ```rust,no_run
/// use jarindex::archive::ArchiveHandle;
/// use jarindex::rewrite::ArchiveRewriter;
/// use std::fs::File;
///
/// let mut archive = ArchiveHandle::open_path("app.ear", "app.ear")?;
/// let mut rewriter = ArchiveRewriter::new(&mut archive);
/// rewriter.replace("lib/b.jar", std::path::PathBuf::from("/tmp/b-rewritten.jar"))?;
/// rewriter.append("lib/b.jar.index", vec![0u8; 16])?;
///
/// let result = rewriter.apply(File::create("app-indexed.ear")?)?;
/// println!("copied {}, appended {}", result.entries_copied, result.entries_appended);
/// # Ok::<(), jarindex::Error>(())
/// ```
pub struct ArchiveRewriter<'a, R: Read + Seek> {
    archive: &'a mut ArchiveHandle<R>,
    operations: Vec<Operation>,
    normalizer: Option<&'a CorruptEntryNormalizer>,
    append_method: CompressionMethod,
}

impl<'a, R: Read + Seek> ArchiveRewriter<'a, R> {
    /// Creates a rewriter for the given archive.
    pub fn new(archive: &'a mut ArchiveHandle<R>) -> Self {
        Self {
            archive,
            operations: Vec::new(),
            normalizer: None,
            append_method: CompressionMethod::Deflated,
        }
    }

    /// Sets the allow-list of entries whose declared size is re-measured.
    pub fn with_normalizer(mut self, normalizer: &'a CorruptEntryNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Sets the compression method of appended entries.
    pub fn with_append_compression(mut self, method: CompressionMethod) -> Self {
        self.append_method = method;
        self
    }

    /// Returns the number of pending operations.
    pub fn pending_operations(&self) -> usize {
        self.operations.len()
    }

    /// Returns whether there are any pending operations.
    pub fn has_pending_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Queues a replacement of an existing entry.
    ///
    /// A later replacement of the same entry wins.
    pub fn replace(&mut self, name: &str, content: impl Into<Content>) -> Result<()> {
        if !self.archive.contains(name) {
            return Err(Error::EntryNotFound {
                archive: self.archive.label().to_string(),
                path: name.to_string(),
            });
        }
        self.operations.push(Operation::Replace {
            name: name.to_string(),
            content: content.into(),
        });
        Ok(())
    }

    /// Queues every replacement of a [`ReplacementMap`].
    pub fn replace_all(&mut self, replacements: ReplacementMap) -> Result<()> {
        let mut replacements: Vec<_> = replacements.into_iter().collect();
        replacements.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, content) in replacements {
            self.replace(&name, content)?;
        }
        Ok(())
    }

    /// Queues a new entry.
    pub fn append(&mut self, name: &str, content: impl Into<Content>) -> Result<()> {
        if self.entry_exists(name) {
            return Err(Error::EntryExists {
                archive: self.archive.label().to_string(),
                path: name.to_string(),
            });
        }
        self.operations.push(Operation::Append {
            name: name.to_string(),
            content: content.into(),
        });
        Ok(())
    }

    /// Applies all pending operations and writes the new archive to `output`.
    pub fn apply<W: Write + Seek>(mut self, output: W) -> Result<RewriteResult> {
        let label = self.archive.label().to_string();
        let mut result = RewriteResult::default();

        let replacements = self.collect_replacements();
        let appends = self.collect_appends();
        // Collect entry information first to avoid borrow issues
        let entries = self.archive.entries().to_vec();
        let comment = self.archive.zip_mut().comment().to_vec();

        let mut writer = ZipWriter::new(output);

        for info in &entries {
            if let Some(content) = replacements.get(info.name.as_str()) {
                let size = content
                    .len()
                    .map_err(|e| Error::scratch(format!("reading replacement for {}", info.name), e))?;
                let options = self.options_like(info, size)?;
                writer
                    .start_file(info.name.as_str(), options)
                    .map_err(|e| Error::write(&label, e))?;
                result.bytes_written += content
                    .copy_to(&mut writer)
                    .map_err(|e| Error::write(&label, e))?;
                result.entries_replaced += 1;
                continue;
            }

            if self.is_quirk(&label, info) {
                let mut data = Vec::new();
                let actual = self.archive.copy_entry(info.index, &mut data)?;
                match Measurement::of(info.size, actual) {
                    Measurement::Consistent => {}
                    Measurement::Mismatch { declared, actual } => {
                        log::warn!(
                            "{label}: {} declares {declared} bytes but holds {actual}, rewriting its header",
                            info.name
                        );
                        let options = self.options_like(info, actual)?;
                        writer
                            .start_file(info.name.as_str(), options)
                            .map_err(|e| Error::write(&label, e))?;
                        writer.write_all(&data).map_err(|e| Error::write(&label, e))?;
                        result.entries_repaired += 1;
                        result.bytes_written += actual;
                        result.repaired.push(info.name.clone());
                        continue;
                    }
                }
            }

            let file = self
                .archive
                .zip_mut()
                .by_index_raw(info.index)
                .map_err(|e| Error::read(&label, e))?;
            writer
                .raw_copy_file(file)
                .map_err(|e| Error::write(&label, e))?;
            result.entries_copied += 1;
        }

        for (name, content) in appends {
            let size = content
                .len()
                .map_err(|e| Error::scratch(format!("reading content of {name}"), e))?;
            let options = SimpleFileOptions::default()
                .compression_method(self.append_method)
                .last_modified_time(DateTime::default())
                .large_file(size >= ZIP64_THRESHOLD);
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::write(&label, e))?;
            result.bytes_written += content
                .copy_to(&mut writer)
                .map_err(|e| Error::write(&label, e))?;
            result.entries_appended += 1;
        }

        if !comment.is_empty() {
            writer.set_raw_comment(comment.into());
        }
        let mut inner = writer.finish().map_err(|e| Error::write(&label, e))?;
        inner.flush().map_err(|e| Error::write(&label, e))?;

        log::debug!(
            "{label}: rewrote {} entries ({} copied, {} replaced, {} repaired, {} appended)",
            result.total_entries(),
            result.entries_copied,
            result.entries_replaced,
            result.entries_repaired,
            result.entries_appended
        );
        Ok(result)
    }

    /// Builds write options that mirror an original entry's metadata.
    fn options_like(&mut self, info: &EntryInfo, size: u64) -> Result<SimpleFileOptions> {
        let label = self.archive.label().to_string();
        let file = self
            .archive
            .zip_mut()
            .by_index_raw(info.index)
            .map_err(|e| Error::read(&label, e))?;

        let method = match info.method {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let mut options = SimpleFileOptions::default()
            .compression_method(method)
            .large_file(size >= ZIP64_THRESHOLD);
        if let Some(modified) = file.last_modified() {
            options = options.last_modified_time(modified);
        }
        if let Some(mode) = file.unix_mode() {
            options = options.unix_permissions(mode);
        }
        Ok(options)
    }

    fn is_quirk(&self, label: &str, info: &EntryInfo) -> bool {
        !info.is_directory
            && self
                .normalizer
                .is_some_and(|normalizer| normalizer.matches(label, &info.name))
    }

    /// Checks if an entry exists in the archive or is being appended.
    fn entry_exists(&self, name: &str) -> bool {
        self.archive.contains(name)
            || self
                .operations
                .iter()
                .any(|op| matches!(op, Operation::Append { name: n, .. } if n == name))
    }

    fn collect_replacements(&self) -> HashMap<String, Content> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Replace { name, content } => Some((name.clone(), content.clone())),
                Operation::Append { .. } => None,
            })
            .collect()
    }

    fn collect_appends(&self) -> Vec<(String, Content)> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Append { name, content } => Some((name.clone(), content.clone())),
                Operation::Replace { .. } => None,
            })
            .collect()
    }
}
