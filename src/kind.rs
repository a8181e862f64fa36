//! Archive classification by file name extension.
//!
//! Every archive level is classified purely from its name: the text after the
//! last `.` of the final path segment decides whether the archive carries class
//! files, nested archives, or both. Container types additionally select a
//! [`SearchRule`] table that tells the [locator](crate::locate) where nested
//! archives live.
//!
//! ```rust
//! use jarindex::kind::{ArchiveKind, classify};
//!
//! assert_eq!(classify("lib/commons.jar").unwrap(), ArchiveKind::Library);
//! assert_eq!(classify("shop.war").unwrap(), ArchiveKind::Both);
//! assert_eq!(classify("app.ear").unwrap(), ArchiveKind::Container);
//! assert!(classify("README").is_err());
//! ```

use std::fmt;

use crate::{Error, Result};

/// The role set of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Carries class files only (JAR).
    Library,
    /// Carries nested archives only (EAR, RAR).
    Container,
    /// Carries class files and nested archives (WAR).
    Both,
    /// The extension is not a known archive type.
    Unknown,
}

impl ArchiveKind {
    /// Returns `true` if class files of this archive are indexed.
    pub fn contains_classes(self) -> bool {
        matches!(self, ArchiveKind::Library | ArchiveKind::Both)
    }

    /// Returns `true` if this archive is searched for nested archives.
    pub fn contains_sub_archives(self) -> bool {
        matches!(self, ArchiveKind::Container | ArchiveKind::Both)
    }
}

/// A concrete archive type derived from an extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveType {
    /// `*.jar`
    Jar,
    /// `*.war`
    War,
    /// `*.ear`
    Ear,
    /// `*.rar` (resource adapter archive)
    Rar,
    /// Any other extension, kept verbatim.
    Unknown(String),
}

impl ArchiveType {
    /// Classifies a file or entry name.
    ///
    /// Only the last path segment is considered, so `lib/b.jar` and `b.jar`
    /// classify identically. Matching is exact: `B.JAR` is [`Unknown`](Self::Unknown).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedArtifactType`] when the name has no extension.
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = extension(name).ok_or_else(|| Error::UnrecognizedArtifactType {
            name: name.to_string(),
        })?;
        Ok(match extension {
            "jar" => ArchiveType::Jar,
            "war" => ArchiveType::War,
            "ear" => ArchiveType::Ear,
            "rar" => ArchiveType::Rar,
            other => ArchiveType::Unknown(other.to_string()),
        })
    }

    /// Returns the role set of this type.
    pub fn kind(&self) -> ArchiveKind {
        match self {
            ArchiveType::Jar => ArchiveKind::Library,
            ArchiveType::War => ArchiveKind::Both,
            ArchiveType::Ear | ArchiveType::Rar => ArchiveKind::Container,
            ArchiveType::Unknown(_) => ArchiveKind::Unknown,
        }
    }

    /// Returns the extension this type was derived from.
    pub fn extension(&self) -> &str {
        match self {
            ArchiveType::Jar => "jar",
            ArchiveType::War => "war",
            ArchiveType::Ear => "ear",
            ArchiveType::Rar => "rar",
            ArchiveType::Unknown(ext) => ext,
        }
    }

    /// Returns the nested-archive search rules for this container type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedContainerKind`] for types that have no
    /// search rules (`jar` and unknown extensions).
    pub fn search_rules(&self, name: &str) -> Result<&'static [SearchRule]> {
        match self {
            ArchiveType::Ear => Ok(EAR_RULES),
            ArchiveType::War => Ok(WAR_RULES),
            ArchiveType::Rar => Ok(RAR_RULES),
            ArchiveType::Jar | ArchiveType::Unknown(_) => Err(Error::UnsupportedContainerKind {
                name: name.to_string(),
                extension: self.extension().to_string(),
            }),
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Classifies a name into its role set.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedArtifactType`] when the name has no extension.
pub fn classify(name: &str) -> Result<ArchiveKind> {
    ArchiveType::from_name(name).map(|t| t.kind())
}

/// One location searched for nested archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRule {
    /// Directory prefix, `""` for the archive root, otherwise ending in `/`.
    pub directory: &'static str,
    /// Accepted extensions of direct children of [`directory`](Self::directory).
    pub extensions: &'static [&'static str],
}

impl SearchRule {
    /// Returns `true` if `entry_name` is a direct child of this rule's directory
    /// with one of the accepted extensions.
    pub fn matches(&self, entry_name: &str) -> bool {
        let Some(file_name) = entry_name.strip_prefix(self.directory) else {
            return false;
        };
        if file_name.is_empty() || file_name.contains('/') {
            return false;
        }
        matches!(extension(file_name), Some(ext) if self.extensions.contains(&ext))
    }
}

const EAR_RULES: &[SearchRule] = &[
    SearchRule {
        directory: "",
        extensions: &["jar", "war", "rar"],
    },
    SearchRule {
        directory: "lib/",
        extensions: &["jar"],
    },
];

const WAR_RULES: &[SearchRule] = &[SearchRule {
    directory: "lib/",
    extensions: &["jar"],
}];

const RAR_RULES: &[SearchRule] = &[SearchRule {
    directory: "",
    extensions: &["jar"],
}];

/// Returns the final path segment of an entry or file name.
pub(crate) fn file_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

fn extension(name: &str) -> Option<&str> {
    let file = file_name(name);
    file.rfind('.').map(|dot| &file[dot + 1..])
}
