//! Scoped scratch storage for nested archives and rewritten outputs.
//!
//! One [`Scratch`] serves a whole run. Its directory is created on first use,
//! so a run that finds nothing to change touches the file system only for
//! reading. Every file handed out is a [`NamedTempFile`] inside that directory
//! and is deleted when dropped; the directory itself is removed when the
//! `Scratch` is dropped or [`close`](Scratch::close)d, whichever comes first,
//! including on error paths.

use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempDir};

use crate::archive::ArchiveHandle;
use crate::kind::file_name;
use crate::locate::SubArchiveRef;
use crate::{Error, Result};

const DIR_PREFIX: &str = "jarindex-";

/// Lazily created per-run scratch directory.
#[derive(Debug, Default)]
pub struct Scratch {
    parent: Option<PathBuf>,
    dir: Option<TempDir>,
}

impl Scratch {
    /// Creates scratch storage under `parent`, or the system temp directory.
    pub fn new(parent: Option<PathBuf>) -> Self {
        Self { parent, dir: None }
    }

    /// Returns the scratch directory if it has been created.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Returns `true` once any scratch file has been requested.
    pub fn is_materialized(&self) -> bool {
        self.dir.is_some()
    }

    fn dir(&mut self) -> Result<&Path> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => {
                let mut builder = Builder::new();
                builder.prefix(DIR_PREFIX);
                let dir = match &self.parent {
                    Some(parent) => builder.tempdir_in(parent),
                    None => builder.tempdir(),
                }
                .map_err(|e| Error::scratch("creating scratch directory", e))?;
                log::debug!("scratch directory {}", dir.path().display());
                dir
            }
        };
        Ok(self.dir.insert(dir).path())
    }

    fn temp_file(&mut self, name_hint: &str) -> Result<NamedTempFile> {
        let suffix = format!("-{}", file_name(name_hint));
        let dir = self.dir()?;
        Builder::new()
            .prefix("part-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| Error::scratch(format!("creating temp file for {name_hint}"), e))
    }

    /// Materializes a nested archive by streaming its content to a temp file.
    ///
    /// The returned file is positioned at its start.
    pub fn extract<R: Read + Seek>(
        &mut self,
        parent: &mut ArchiveHandle<R>,
        sub: &SubArchiveRef,
    ) -> Result<NamedTempFile> {
        let mut temp = self.temp_file(&sub.name)?;
        {
            let mut sink = BufWriter::new(temp.as_file_mut());
            parent.copy_entry(sub.index, &mut sink)?;
            sink.flush()
                .map_err(|e| Error::scratch(format!("extracting {}", sub.name), e))?;
        }
        temp.as_file_mut()
            .rewind()
            .map_err(|e| Error::scratch(format!("extracting {}", sub.name), e))?;
        Ok(temp)
    }

    /// Creates an empty temp file to receive a rewritten archive.
    pub fn output_file(&mut self, name_hint: &str) -> Result<NamedTempFile> {
        self.temp_file(name_hint)
    }

    /// Removes the scratch directory now, reporting failures.
    pub fn close(self) -> Result<()> {
        match self.dir {
            Some(dir) => dir
                .close()
                .map_err(|e| Error::scratch("removing scratch directory", e)),
            None => Ok(()),
        }
    }
}
