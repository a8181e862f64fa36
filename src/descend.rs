//! Recursive descent over nested archives.
//!
//! The coordinator visits an artifact depth first: a level is opened, its own
//! index is built (unless one exists), and each located nested archive is
//! extracted to scratch storage and visited in turn before the next sibling
//! is opened. Once all children of a level have finished, the level is
//! rewritten if it received a fresh embedded index, a replaced child or a
//! child's sibling index. The rewritten copy is handed to the parent, which
//! splices it in place of the original entry.
//!
//! Nesting is tracked with an explicit stack of open levels, so the depth of
//! the input never grows the call stack.

use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom};

use tempfile::NamedTempFile;

use crate::archive::{ArchiveHandle, sibling_index_name};
use crate::index::{
    IndexArtifact, IndexWriter, Indexer, IndexerFactory, build_index, is_class_entry,
};
use crate::kind::{ArchiveKind, ArchiveType};
use crate::locate::{SubArchiveRef, find_sub_archives};
use crate::options::{IndexOptions, IndexPlacement};
use crate::outcome::{ChildOutcome, IndexStatus, RecursionOutcome};
use crate::progress::ProgressReporter;
use crate::rewrite::{Content, ReplacementMap, rewrite_archive};
use crate::scratch::Scratch;
use crate::{Error, Result};

/// Separator between nesting levels in archive labels.
pub const NESTING_SEPARATOR: &str = "!/";

/// Result of descending into a top-level artifact.
#[derive(Debug)]
pub struct Descended {
    /// The aggregated outcome tree.
    pub outcome: RecursionOutcome,
    /// The rewritten artifact, if the top level had to be rewritten.
    ///
    /// The file lives in the [`Scratch`] passed to
    /// [`Coordinator::descend`] and is only valid while that `Scratch` is alive.
    pub rewritten: Option<NamedTempFile>,
    /// The artifact's own fresh index with [`IndexPlacement::Sibling`].
    pub sibling_index: Option<IndexArtifact>,
}

/// Reader behind an open level: the caller's reader or a scratch copy.
enum LevelReader<R> {
    Root(R),
    Nested(BufReader<NamedTempFile>),
}

impl<R: Read> Read for LevelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            LevelReader::Root(r) => r.read(buf),
            LevelReader::Nested(r) => r.read(buf),
        }
    }
}

impl<R: Seek> Seek for LevelReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            LevelReader::Root(r) => r.seek(pos),
            LevelReader::Nested(r) => r.seek(pos),
        }
    }
}

/// One open archive level on the descent stack.
struct Frame<R> {
    /// Entry name in the parent, `None` for the top level.
    entry: Option<String>,
    depth: usize,
    archive_type: ArchiveType,
    archive: ArchiveHandle<LevelReader<R>>,
    index: IndexStatus,
    pending: std::vec::IntoIter<SubArchiveRef>,
    children: Vec<ChildOutcome>,
    replacements: ReplacementMap,
    /// Rewritten children; deleted once this level is finished.
    replacement_files: Vec<NamedTempFile>,
    /// Sibling indices of children, appended to this level.
    appended: Vec<(String, Vec<u8>)>,
}

/// A finished level, ready to be handed to its parent.
struct Finished {
    entry: Option<String>,
    outcome: RecursionOutcome,
    rewritten: Option<NamedTempFile>,
    sibling_index: Option<IndexArtifact>,
}

/// Drives the indexer and rewriter over an archive tree.
pub struct Coordinator<'a, F, W> {
    factory: &'a F,
    writer: &'a W,
    options: &'a IndexOptions,
}

impl<'a, F, W> Coordinator<'a, F, W>
where
    F: IndexerFactory,
    W: IndexWriter<<F::Indexer as Indexer>::Index>,
{
    /// Creates a coordinator over the given collaborators.
    pub fn new(factory: &'a F, writer: &'a W, options: &'a IndexOptions) -> Self {
        Self {
            factory,
            writer,
            options,
        }
    }

    /// Descends into the artifact `name`, read from `reader`.
    ///
    /// `sibling_present` tells whether a sibling index file already exists
    /// next to the artifact; it only matters with [`IndexPlacement::Sibling`].
    ///
    /// Nothing outside `scratch` is written. All scratch files except the
    /// returned rewritten artifact are removed before this returns, on success
    /// and on error. The rewritten artifact itself is removed when `scratch`
    /// is dropped or closed, so `scratch` must outlive [`Descended::rewritten`].
    pub fn descend<R: Read + Seek>(
        &self,
        name: &str,
        reader: R,
        sibling_present: bool,
        scratch: &mut Scratch,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Descended> {
        let mut stack: Vec<Frame<R>> = Vec::new();
        let mut current = self.open_level(
            name.to_string(),
            None,
            0,
            LevelReader::Root(reader),
            sibling_present,
            progress,
        )?;

        loop {
            if let Some(sub) = current.pending.next() {
                let child = self.open_nested(&mut current, sub, scratch, progress)?;
                stack.push(std::mem::replace(&mut current, child));
                continue;
            }

            let finished = self.finish(current, scratch, progress)?;
            match stack.pop() {
                Some(mut parent) => {
                    attach(&mut parent, finished);
                    current = parent;
                }
                None => {
                    return Ok(Descended {
                        outcome: finished.outcome,
                        rewritten: finished.rewritten,
                        sibling_index: finished.sibling_index,
                    });
                }
            }
        }
    }

    fn open_nested<R: Read + Seek>(
        &self,
        parent: &mut Frame<R>,
        sub: SubArchiveRef,
        scratch: &mut Scratch,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Frame<R>> {
        let label = format!("{}{NESTING_SEPARATOR}{}", parent.archive.label(), sub.name);
        log::debug!("extracting {label} ({} bytes)", sub.size);
        let temp = scratch.extract(&mut parent.archive, &sub)?;
        let sibling_present = self.options.placement.is_sibling()
            && parent.archive.contains(&sibling_index_name(&sub.name));
        self.open_level(
            label,
            Some(sub.name),
            parent.depth + 1,
            LevelReader::Nested(BufReader::new(temp)),
            sibling_present,
            progress,
        )
    }

    fn open_level<R: Read + Seek>(
        &self,
        label: String,
        entry: Option<String>,
        depth: usize,
        reader: LevelReader<R>,
        sibling_present: bool,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Frame<R>> {
        let archive_type = ArchiveType::from_name(entry.as_deref().unwrap_or(&label))?;
        let kind = archive_type.kind();
        if kind == ArchiveKind::Unknown {
            return Err(Error::UnrecognizedArtifactType { name: label });
        }

        progress.on_level_start(&label, &archive_type, depth);
        log::debug!("visiting {label} ({archive_type}, depth {depth})");
        let mut archive = ArchiveHandle::new(reader, label)?;

        let index = if !kind.contains_classes() {
            IndexStatus::NotApplicable
        } else if sibling_present || archive.has_index(&self.options.index_entry_name) {
            log::debug!("{} is already indexed", archive.label());
            progress.on_already_indexed(archive.label());
            IndexStatus::AlreadyIndexed
        } else if self.options.dry_run {
            let class_entries = archive
                .entries()
                .iter()
                .filter(|e| !e.is_directory && is_class_entry(&e.name))
                .count();
            IndexStatus::Pending { class_entries }
        } else {
            let built = build_index(&mut archive, self.factory.create())?;
            let bytes = self.writer.write(&built.index)?;
            log::info!(
                "indexed {} class(es) in {}",
                built.class_count,
                archive.label()
            );
            progress.on_index_built(archive.label(), built.class_count);
            IndexStatus::Built(IndexArtifact::new(built.class_count, bytes))
        };

        let pending = if kind.contains_sub_archives() {
            find_sub_archives(&archive_type, &archive)?
        } else {
            Vec::new()
        };

        Ok(Frame {
            entry,
            depth,
            archive_type,
            archive,
            index,
            pending: pending.into_iter(),
            children: Vec::new(),
            replacements: ReplacementMap::new(),
            replacement_files: Vec::new(),
            appended: Vec::new(),
        })
    }

    fn finish<R: Read + Seek>(
        &self,
        frame: Frame<R>,
        scratch: &mut Scratch,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Finished> {
        let Frame {
            entry,
            archive_type,
            mut archive,
            index,
            children,
            replacements,
            replacement_files,
            mut appended,
            ..
        } = frame;

        let mut sibling_index = None;
        if let IndexStatus::Built(artifact) = &index {
            match self.options.placement {
                IndexPlacement::Embedded => {
                    appended.push((
                        self.options.index_entry_name.clone(),
                        artifact.bytes().to_vec(),
                    ));
                }
                IndexPlacement::Sibling => sibling_index = Some(artifact.clone()),
            }
        }

        let rewritten = if self.options.dry_run
            || (replacements.is_empty() && appended.is_empty())
        {
            None
        } else {
            let name_hint = entry.as_deref().unwrap_or(archive.label()).to_string();
            let mut output = scratch.output_file(&name_hint)?;
            let result = rewrite_archive(
                &mut archive,
                replacements,
                appended,
                &self.options.normalizer,
                self.options.index_compression,
                BufWriter::new(output.as_file_mut()),
            )?;
            for name in &result.repaired {
                progress.on_warning(&format!(
                    "corrected declared size of {name} in {}",
                    archive.label()
                ));
            }
            log::info!(
                "rewrote {} ({} entries, {} replaced, {} appended)",
                archive.label(),
                result.total_entries(),
                result.entries_replaced,
                result.entries_appended
            );
            progress.on_rewritten(archive.label(), result.total_entries());
            Some(output)
        };
        drop(replacement_files);

        let outcome = RecursionOutcome::new(archive.label(), archive_type, index, children);
        Ok(Finished {
            entry,
            outcome,
            rewritten,
            sibling_index,
        })
    }
}

/// Records a finished child in its parent frame.
fn attach<R>(parent: &mut Frame<R>, child: Finished) {
    let Finished {
        entry,
        outcome,
        rewritten,
        sibling_index,
    } = child;
    let Some(entry) = entry else {
        return;
    };

    let replaced = rewritten.is_some();
    if let Some(file) = rewritten {
        parent
            .replacements
            .insert(entry.clone(), Content::File(file.path().to_path_buf()));
        parent.replacement_files.push(file);
    }

    let sibling_index = sibling_index.map(|artifact| {
        let name = sibling_index_name(&entry);
        parent.appended.push((name.clone(), artifact.into_bytes()));
        name
    });

    parent.children.push(ChildOutcome {
        entry,
        outcome,
        replaced,
        sibling_index,
    });
}
