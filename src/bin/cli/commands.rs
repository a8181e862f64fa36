//! Command implementations for the CLI tool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use jarindex::archive::{ArchiveHandle, INDEX_ENTRY};
use jarindex::normalize::{CorruptEntryNormalizer, QuirkRule};
use jarindex::engine::folder_artifacts;
use jarindex::{Engine, IndexOptions, IndexPlacement, IndexReport, OutputTarget, read_index};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::CliProgress;
use crate::{OutputFormat, Placement};

/// Configuration for the index command.
pub struct IndexConfig<'a> {
    pub artifacts: &'a [PathBuf],
    pub placement: Placement,
    pub repackage: Option<String>,
    pub repair: Vec<QuirkRule>,
    pub stored_index: bool,
    pub scratch_dir: Option<PathBuf>,
    pub skip: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Index command implementation
pub fn index(config: &IndexConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let mut normalizer = CorruptEntryNormalizer::new();
    for rule in &config.repair {
        normalizer.push(rule.clone());
    }

    let mut options = IndexOptions::new()
        .placement(config.placement.into())
        .stored_index(config.stored_index)
        .normalizer(normalizer)
        .skip(config.skip);
    if let Some(suffix) = &config.repackage {
        if suffix.is_empty() {
            eprintln!("Error: repackage suffix must not be empty");
            return ExitCode::BadArgs;
        }
        options = options.target(OutputTarget::Repackage {
            suffix: suffix.clone(),
        });
    }
    if let Some(dir) = &config.scratch_dir {
        options = options.scratch_dir(dir);
    }

    let engine = Engine::default().with_options(options);
    let mut progress = CliProgress::new(config.artifacts.len() as u64, config.quiet);
    let result = index_each(&engine, config.artifacts, &mut progress, &crate::INTERRUPTED);
    progress.finish();

    match result {
        Ok(reports) => {
            print_reports(formatter.as_ref(), &reports, config.quiet, config.format);
            ExitCode::Success
        }
        Err(code) => code,
    }
}

/// Folder command implementation
pub fn folder(dir: &Path, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);

    let jars = match folder_artifacts(dir) {
        Ok(jars) => jars,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    // Folder mode always writes sibling index files
    let engine =
        Engine::default().with_options(IndexOptions::new().placement(IndexPlacement::Sibling));
    let mut progress = CliProgress::new(jars.len() as u64, quiet);
    let result = index_each(&engine, &jars, &mut progress, &crate::INTERRUPTED);
    progress.finish();

    match result {
        Ok(reports) => {
            print_reports(formatter.as_ref(), &reports, quiet, format);
            ExitCode::Success
        }
        Err(code) => code,
    }
}

/// Indexes artifacts in order, stopping at the first error or once `interrupted` is set.
fn index_each(
    engine: &Engine,
    artifacts: &[PathBuf],
    progress: &mut CliProgress,
    interrupted: &AtomicBool,
) -> Result<Vec<IndexReport>, ExitCode> {
    let mut reports = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if interrupted.load(Ordering::SeqCst) {
            eprintln!("Interrupted before {}", artifact.display());
            return Err(ExitCode::Interrupted);
        }
        match engine.index_artifact_with_progress(artifact, &mut *progress) {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("Error: {}", e);
                return Err(error_to_exit_code(&e));
            }
        }
        progress.inc();
    }
    Ok(reports)
}

/// Inspect command implementation
pub fn inspect(artifact: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    match Engine::default().inspect(artifact) {
        Ok(outcome) => {
            print!("{}", formatter.format_outcome(&outcome));
            if format == OutputFormat::Json {
                println!();
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        }
    }
}

/// Dump command implementation
pub fn dump(path: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    let label = path.display().to_string();

    let bytes = match load_index_bytes(path, &label) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };

    match read_index(&bytes) {
        Ok(index) => {
            print!("{}", formatter.format_index(&label, bytes.len() as u64, &index));
            if format == OutputFormat::Json {
                println!();
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        }
    }
}

/// Reads raw index bytes, either from an index file or from an archive's index entry.
fn load_index_bytes(path: &Path, label: &str) -> Result<Vec<u8>, ExitCode> {
    if jarindex::classify(label).is_ok_and(|kind| kind != jarindex::ArchiveKind::Unknown) {
        let mut archive = ArchiveHandle::open_path(path, label).map_err(|e| {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        })?;
        let Some(index) = archive.entry(INDEX_ENTRY).map(|e| e.index) else {
            eprintln!("Error: {} has no {}", label, INDEX_ENTRY);
            return Err(ExitCode::BadArchive);
        };
        return archive.read_entry(index).map_err(|e| {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        });
    }

    fs::read(path).map_err(|e| {
        eprintln!("Error: cannot read {}: {}", label, e);
        ExitCode::IoError
    })
}

fn print_reports(
    formatter: &dyn crate::output::OutputFormatter,
    reports: &[IndexReport],
    quiet: bool,
    format: OutputFormat,
) {
    if quiet && format == OutputFormat::Human {
        return;
    }
    print!("{}", formatter.format_reports(reports));
    if format == OutputFormat::Json {
        println!();
    }
}
