//! Top-level driver: artifacts in, indexed artifacts out.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::archive::sibling_index_name;
use crate::descend::Coordinator;
use crate::index::{BinaryIndexWriter, ClassSummaryIndexer, IndexWriter, Indexer, IndexerFactory};
use crate::kind::ArchiveType;
use crate::options::{IndexOptions, IndexPlacement, OutputTarget};
use crate::outcome::RecursionOutcome;
use crate::progress::{NoProgress, ProgressReporter};
use crate::scratch::Scratch;
use crate::{Error, Result};

/// Factory of the default indexer.
pub type DefaultIndexerFactory = fn() -> ClassSummaryIndexer;

/// Result of indexing one artifact.
#[derive(Debug, Clone)]
pub struct IndexReport {
    /// The artifact that was indexed.
    pub artifact: PathBuf,
    /// Outcome tree of the artifact.
    pub outcome: RecursionOutcome,
    /// Files written, in the order they were written. Empty if nothing changed.
    pub written: Vec<PathBuf>,
}

impl IndexReport {
    /// Whether the artifact (or anything nested in it) changed.
    pub fn changed(&self) -> bool {
        self.outcome.changed()
    }
}

/// Indexes artifacts with a pair of index collaborators.
///
/// # Example
///
/// ```rust,no_run
/// use jarindex::{Engine, IndexOptions, IndexPlacement};
///
/// let engine = Engine::default()
///     .with_options(IndexOptions::new().placement(IndexPlacement::Sibling));
/// let report = engine.index_artifact("target/app.ear")?;
/// for path in &report.written {
///     println!("wrote {}", path.display());
/// }
/// # Ok::<(), jarindex::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine<F = DefaultIndexerFactory, W = BinaryIndexWriter> {
    factory: F,
    writer: W,
    options: IndexOptions,
}

impl Default for Engine<DefaultIndexerFactory, BinaryIndexWriter> {
    fn default() -> Self {
        Engine::new(
            ClassSummaryIndexer::default as DefaultIndexerFactory,
            BinaryIndexWriter,
        )
    }
}

impl<F, W> Engine<F, W>
where
    F: IndexerFactory,
    W: IndexWriter<<F::Indexer as Indexer>::Index>,
{
    /// Creates an engine with default options.
    pub fn new(factory: F, writer: W) -> Self {
        Self {
            factory,
            writer,
            options: IndexOptions::default(),
        }
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Indexes one artifact.
    ///
    /// If nothing changed, nothing is written.
    pub fn index_artifact(&self, path: impl AsRef<Path>) -> Result<IndexReport> {
        self.index_artifact_with_progress(path, NoProgress)
    }

    /// Indexes one artifact, reporting progress.
    pub fn index_artifact_with_progress<P: ProgressReporter>(
        &self,
        path: impl AsRef<Path>,
        mut progress: P,
    ) -> Result<IndexReport> {
        self.run(path.as_ref(), &self.options, &mut progress)
    }

    /// Indexes several artifacts in order, stopping at the first error.
    pub fn index_all<I, P>(&self, paths: I) -> Result<Vec<IndexReport>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .map(|path| self.index_artifact(path))
            .collect()
    }

    /// Indexes every `*.jar` directly inside `dir`, in name order.
    ///
    /// Indices are always written as `<jar>.index` sibling files, whatever
    /// placement is configured.
    pub fn index_folder(&self, dir: impl AsRef<Path>) -> Result<Vec<IndexReport>> {
        self.index_folder_with_progress(dir, NoProgress)
    }

    /// Indexes a folder of jars, reporting progress.
    pub fn index_folder_with_progress<P: ProgressReporter>(
        &self,
        dir: impl AsRef<Path>,
        mut progress: P,
    ) -> Result<Vec<IndexReport>> {
        let jars = folder_artifacts(dir)?;
        let options = self.options.clone().placement(IndexPlacement::Sibling);
        jars.iter()
            .map(|jar| self.run(jar, &options, &mut progress))
            .collect()
    }

    /// Reports what indexing an artifact would do, without writing anything.
    pub fn inspect(&self, path: impl AsRef<Path>) -> Result<RecursionOutcome> {
        let options = self.options.clone().dry_run(true);
        self.run(path.as_ref(), &options, &mut NoProgress)
            .map(|report| report.outcome)
    }

    fn run(
        &self,
        path: &Path,
        options: &IndexOptions,
        progress: &mut dyn ProgressReporter,
    ) -> Result<IndexReport> {
        if !path.is_file() {
            return Err(Error::ArtifactNotFound {
                path: path.display().to_string(),
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::UnrecognizedArtifactType {
                name: path.display().to_string(),
            })?;

        if options.skip {
            log::info!("skipping {}", path.display());
            return Ok(IndexReport {
                artifact: path.to_path_buf(),
                outcome: RecursionOutcome::skipped(&name, ArchiveType::from_name(&name)?),
                written: Vec::new(),
            });
        }

        let mut scratch = Scratch::new(options.scratch_dir.clone());
        let result = self.run_in(path, &name, options, &mut scratch, progress);
        match (result, scratch.close()) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                log::warn!("{cleanup}");
                Err(e)
            }
        }
    }

    fn run_in(
        &self,
        path: &Path,
        name: &str,
        options: &IndexOptions,
        scratch: &mut Scratch,
        progress: &mut dyn ProgressReporter,
    ) -> Result<IndexReport> {
        let sibling_present = options.placement.is_sibling()
            && path.with_file_name(sibling_index_name(name)).exists();
        let file = File::open(path).map_err(|e| Error::read(name, e))?;

        let coordinator = Coordinator::new(&self.factory, &self.writer, options);
        let descended = coordinator.descend(
            name,
            BufReader::new(file),
            sibling_present,
            scratch,
            progress,
        )?;

        let mut written = Vec::new();
        if descended.outcome.changed() && !options.dry_run {
            let target = match &options.target {
                OutputTarget::ReplaceOriginal => path.to_path_buf(),
                OutputTarget::Repackage { suffix } => repackaged_path(path, suffix),
            };

            match descended.rewritten {
                Some(mut rewritten) => {
                    rewritten
                        .as_file_mut()
                        .rewind()
                        .map_err(|e| Error::scratch("reading rewritten artifact", e))?;
                    write_atomically(&target, path, &mut BufReader::new(rewritten.as_file()))?;
                    written.push(target.clone());
                }
                None if target != path => {
                    let mut original = File::open(path).map_err(|e| Error::read(name, e))?;
                    write_atomically(&target, path, &mut original)?;
                    written.push(target.clone());
                }
                None => {}
            }

            if let Some(index) = descended.sibling_index {
                let sibling = target.with_file_name(sibling_index_name(&file_label(&target)));
                write_atomically(&sibling, path, &mut index.bytes())?;
                written.push(sibling);
            }

            for path in &written {
                log::info!("wrote {}", path.display());
            }
        }

        Ok(IndexReport {
            artifact: path.to_path_buf(),
            outcome: descended.outcome,
            written,
        })
    }
}

/// Lists the `*.jar` files directly inside `dir`, sorted by path.
pub fn folder_artifacts(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::ArtifactNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut jars = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jar") {
            jars.push(path);
        }
    }
    jars.sort();
    log::debug!("{}: {} jar(s)", dir.display(), jars.len());
    Ok(jars)
}

/// Returns `<stem><suffix>.<ext>` next to `path`.
pub fn repackaged_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Writes `target` via a temp file in the same directory and a rename.
///
/// The new file takes the permissions of `like`.
fn write_atomically(target: &Path, like: &Path, content: &mut dyn Read) -> Result<()> {
    let label = target.display().to_string();
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = Builder::new()
        .prefix(".jarindex-")
        .tempfile_in(dir)
        .map_err(|e| Error::scratch(format!("staging {label}"), e))?;
    io::copy(content, staged.as_file_mut()).map_err(|e| Error::write(&label, e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| Error::write(&label, e))?;
    if let Ok(metadata) = fs::metadata(like) {
        fs::set_permissions(staged.path(), metadata.permissions())
            .map_err(|e| Error::write(&label, e))?;
    }
    staged
        .persist(target)
        .map_err(|e| Error::write(&label, e.error))?;
    Ok(())
}
