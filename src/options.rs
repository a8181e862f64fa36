//! Indexing options.

use std::path::PathBuf;

use zip::CompressionMethod;

use crate::archive::INDEX_ENTRY;
use crate::normalize::CorruptEntryNormalizer;

/// Default suffix of repackaged artifacts.
pub const DEFAULT_REPACKAGE_SUFFIX: &str = "-indexed";

/// Where a freshly built index is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPlacement {
    /// Inside the indexed archive at [`IndexOptions::index_entry_name`].
    ///
    /// The archive itself is rewritten, and a nested archive's parent replaces
    /// it with the rewritten bytes.
    #[default]
    Embedded,
    /// Next to the indexed archive, as `<name>.index`.
    ///
    /// The top-level artifact gets a sibling file. A nested archive stays
    /// untouched and its parent gets an extra `<entry>.index` entry.
    Sibling,
}

impl IndexPlacement {
    /// Returns true for [`IndexPlacement::Sibling`].
    pub fn is_sibling(&self) -> bool {
        matches!(self, Self::Sibling)
    }
}

/// What happens to a top-level artifact that changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// Atomically replace the artifact.
    #[default]
    ReplaceOriginal,
    /// Write `<stem><suffix>.<ext>` next to the artifact and leave it untouched.
    Repackage {
        /// Inserted between file stem and extension.
        suffix: String,
    },
}

impl OutputTarget {
    /// Repackaging with [`DEFAULT_REPACKAGE_SUFFIX`].
    pub fn repackage() -> Self {
        Self::Repackage {
            suffix: DEFAULT_REPACKAGE_SUFFIX.to_string(),
        }
    }
}

/// Options controlling an indexing run.
///
/// # Example
///
/// ```rust
/// use jarindex::{IndexOptions, IndexPlacement, OutputTarget};
///
/// let options = IndexOptions::new()
///     .placement(IndexPlacement::Sibling)
///     .target(OutputTarget::repackage())
///     .repair("vendor-api.jar", "META-INF/MANIFEST.MF");
/// assert!(options.placement.is_sibling());
/// ```
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Where fresh indices go.
    pub placement: IndexPlacement,
    /// What happens to a changed top-level artifact.
    pub target: OutputTarget,
    /// Descend and report without building indices or writing anything.
    pub dry_run: bool,
    /// In-archive index location, also probed to detect already indexed archives.
    pub index_entry_name: String,
    /// Compression of appended index entries.
    pub index_compression: CompressionMethod,
    /// Entries whose declared size is re-measured while rewriting.
    pub normalizer: CorruptEntryNormalizer,
    /// Parent directory of scratch storage; the system temp directory if `None`.
    pub scratch_dir: Option<PathBuf>,
    /// Do nothing and report every artifact as unchanged.
    pub skip: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            placement: IndexPlacement::default(),
            target: OutputTarget::default(),
            dry_run: false,
            index_entry_name: INDEX_ENTRY.to_string(),
            index_compression: CompressionMethod::Deflated,
            normalizer: CorruptEntryNormalizer::default(),
            scratch_dir: None,
            skip: false,
        }
    }
}

impl IndexOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the index placement.
    pub fn placement(mut self, placement: IndexPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Sets the output target.
    pub fn target(mut self, target: OutputTarget) -> Self {
        self.target = target;
        self
    }

    /// Enables or disables dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the in-archive index location.
    pub fn index_entry_name(mut self, name: impl Into<String>) -> Self {
        self.index_entry_name = name.into();
        self
    }

    /// Stores appended index entries uncompressed.
    pub fn stored_index(mut self, stored: bool) -> Self {
        self.index_compression = if stored {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        self
    }

    /// Replaces the repair allow-list.
    pub fn normalizer(mut self, normalizer: CorruptEntryNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Adds one entry to the repair allow-list.
    pub fn repair(mut self, archive: impl Into<String>, entry: impl Into<String>) -> Self {
        self.normalizer = self.normalizer.with_rule(archive, entry);
        self
    }

    /// Sets the parent directory of scratch storage.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Enables or disables skipping.
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }
}
