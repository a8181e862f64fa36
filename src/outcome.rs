//! Per-level results of a descent and their aggregation.
//!
//! A [`RecursionOutcome`] is an immutable tree mirroring the nesting of the
//! indexed artifact. Its `changed` flag is computed once, when the value is
//! constructed, from the level's own index status and its children:
//!
//! ```text
//! changed  <=>  a fresh index was built at this level
//!               OR at least one child changed
//! ```
//!
//! Only the root's flag decides whether anything is written.

use std::fmt;

use crate::index::IndexArtifact;
use crate::kind::ArchiveType;

/// What happened to a level's own index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    /// The level carries no class files of its own (EAR, RAR).
    NotApplicable,
    /// An index already existed; nothing was built.
    AlreadyIndexed,
    /// Dry run: an index would be built from this many class entries.
    Pending {
        /// Class entries that would be indexed.
        class_entries: usize,
    },
    /// A fresh index was built.
    Built(IndexArtifact),
}

impl IndexStatus {
    /// Returns `true` if this level gets (or in a dry run would get) a new index.
    pub fn is_fresh(&self) -> bool {
        matches!(self, IndexStatus::Built(_) | IndexStatus::Pending { .. })
    }

    /// Returns the built artifact, if any.
    pub fn artifact(&self) -> Option<&IndexArtifact> {
        match self {
            IndexStatus::Built(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Returns the number of class entries indexed or to be indexed.
    pub fn class_count(&self) -> Option<usize> {
        match self {
            IndexStatus::Built(artifact) => Some(artifact.class_count()),
            IndexStatus::Pending { class_entries } => Some(*class_entries),
            _ => None,
        }
    }

    /// Short label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::NotApplicable => "n/a",
            IndexStatus::AlreadyIndexed => "already indexed",
            IndexStatus::Pending { .. } => "pending",
            IndexStatus::Built(_) => "built",
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A nested archive's outcome as seen from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildOutcome {
    /// Entry name of the nested archive in the parent.
    pub entry: String,
    /// The nested archive's own outcome.
    pub outcome: RecursionOutcome,
    /// Whether the parent replaced the entry with rewritten bytes.
    pub replaced: bool,
    /// Name of the `<entry>.index` entry appended to the parent, if any.
    pub sibling_index: Option<String>,
}

/// Outcome of one archive level and, transitively, everything nested in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursionOutcome {
    name: String,
    archive_type: ArchiveType,
    index: IndexStatus,
    children: Vec<ChildOutcome>,
    changed: bool,
}

impl RecursionOutcome {
    /// Aggregates a level from its index status and its children.
    ///
    /// Children must be given in the order their archives were located.
    pub fn new(
        name: impl Into<String>,
        archive_type: ArchiveType,
        index: IndexStatus,
        children: Vec<ChildOutcome>,
    ) -> Self {
        let changed = index.is_fresh() || children.iter().any(|c| c.outcome.changed);
        Self {
            name: name.into(),
            archive_type,
            index,
            children,
            changed,
        }
    }

    /// An outcome for an artifact that was not looked at.
    pub fn skipped(name: impl Into<String>, archive_type: ArchiveType) -> Self {
        Self::new(name, archive_type, IndexStatus::NotApplicable, Vec::new())
    }

    /// Nesting path of the level, e.g. `app.ear!/lib/b.jar`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level's archive type.
    pub fn archive_type(&self) -> &ArchiveType {
        &self.archive_type
    }

    /// The level's own index status.
    pub fn index(&self) -> &IndexStatus {
        &self.index
    }

    /// Child outcomes in location order.
    pub fn children(&self) -> &[ChildOutcome] {
        &self.children
    }

    /// Whether this level, or anything nested in it, changed.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Iterates over this level and all nested levels, depth first, parents first.
    ///
    /// Yields `(depth, outcome)` with depth 0 for `self`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// Re-checks the change-propagation rule at every level.
    pub fn is_consistent(&self) -> bool {
        self.walk().all(|(_, level)| {
            level.changed
                == (level.index.is_fresh() || level.children.iter().any(|c| c.outcome.changed))
        })
    }

    /// Counts levels by status.
    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for (depth, level) in self.walk() {
            summary.levels += 1;
            summary.max_depth = summary.max_depth.max(depth);
            if level.changed {
                summary.changed_levels += 1;
            }
            match &level.index {
                IndexStatus::Built(artifact) => {
                    summary.indices_built += 1;
                    summary.classes_indexed += artifact.class_count();
                }
                IndexStatus::Pending { class_entries } => {
                    summary.indices_pending += 1;
                    summary.classes_indexed += class_entries;
                }
                IndexStatus::AlreadyIndexed => summary.already_indexed += 1,
                IndexStatus::NotApplicable => {}
            }
        }
        summary
    }
}

/// Depth-first iterator over an outcome tree. See [`RecursionOutcome::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<(usize, &'a RecursionOutcome)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a RecursionOutcome);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, level) = self.stack.pop()?;
        self.stack.extend(
            level
                .children
                .iter()
                .rev()
                .map(|child| (depth + 1, &child.outcome)),
        );
        Some((depth, level))
    }
}

/// Level counts of an outcome tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeSummary {
    /// Levels visited.
    pub levels: usize,
    /// Deepest nesting level.
    pub max_depth: usize,
    /// Levels whose `changed` flag is set.
    pub changed_levels: usize,
    /// Fresh indices built.
    pub indices_built: usize,
    /// Indices a dry run would build.
    pub indices_pending: usize,
    /// Levels that already carried an index.
    pub already_indexed: usize,
    /// Class entries indexed or to be indexed.
    pub classes_indexed: usize,
}
