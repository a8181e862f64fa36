//! Discovery of nested archives inside a container.
//!
//! | Container | Searched locations |
//! |-----------|--------------------|
//! | `ear` | root `*.jar`, `*.war`, `*.rar`, then `lib/*.jar` |
//! | `war` | `lib/*.jar` |
//! | `rar` | root `*.jar` |
//!
//! Locations are searched in table order and each contributes its matches in
//! native entry order. Results are not sorted and not de-duplicated.

use std::io::{Read, Seek};

use crate::Result;
use crate::archive::ArchiveHandle;
use crate::kind::ArchiveType;

/// A nested archive, identified by its entry name in the parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubArchiveRef {
    /// Entry name within the parent archive.
    pub name: String,
    /// Entry position in the parent's central directory.
    pub index: usize,
    /// Declared uncompressed size.
    pub size: u64,
}

/// Locates the nested archives of a container.
///
/// # Errors
///
/// Returns [`Error::UnsupportedContainerKind`](crate::Error::UnsupportedContainerKind)
/// when `archive_type` has no search rules.
pub fn find_sub_archives<R: Read + Seek>(
    archive_type: &ArchiveType,
    archive: &ArchiveHandle<R>,
) -> Result<Vec<SubArchiveRef>> {
    let rules = archive_type.search_rules(archive.label())?;
    let mut found = Vec::new();
    for rule in rules {
        found.extend(
            archive
                .entries()
                .iter()
                .filter(|e| !e.is_directory && rule.matches(&e.name))
                .map(|e| SubArchiveRef {
                    name: e.name.clone(),
                    index: e.index,
                    size: e.size,
                }),
        );
    }
    log::debug!(
        "{}: located {} nested archive(s)",
        archive.label(),
        found.len()
    );
    Ok(found)
}
