//! Repair of entries whose declared size disagrees with their content.
//!
//! Some vendor-built archives declare a wrong uncompressed size for one of
//! their own entries, typically `META-INF/MANIFEST.MF`. Copying such an entry
//! verbatim carries the wrong size into the rewritten archive, and many zip
//! readers then refuse the archive or truncate the entry. Entries listed here
//! are instead decompressed in full, measured, and written again with the
//! measured size.
//!
//! # Example
//!
//! ```rust
//! use jarindex::normalize::CorruptEntryNormalizer;
//!
//! let normalizer = CorruptEntryNormalizer::new()
//!     .with_rule("vendor-api.jar", "META-INF/MANIFEST.MF")
//!     .with_rule("*", "META-INF/INDEX.LIST");
//!
//! assert!(normalizer.matches("vendor-api.jar", "META-INF/MANIFEST.MF"));
//! assert!(normalizer.matches("anything.jar", "META-INF/INDEX.LIST"));
//! assert!(!normalizer.matches("other.jar", "META-INF/MANIFEST.MF"));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::kind::file_name;

/// Archive name that matches every containing archive.
pub const ANY_ARCHIVE: &str = "*";

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuirkRule {
    /// File name of the containing archive, or [`ANY_ARCHIVE`].
    pub archive: String,
    /// Exact entry name inside that archive.
    pub entry: String,
}

impl QuirkRule {
    /// Creates a rule.
    pub fn new(archive: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    fn matches(&self, archive: &str, entry: &str) -> bool {
        self.entry == entry && (self.archive == ANY_ARCHIVE || self.archive == file_name(archive))
    }
}

impl fmt::Display for QuirkRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.archive, self.entry)
    }
}

impl FromStr for QuirkRule {
    type Err = String;

    /// Parses `ARCHIVE:ENTRY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((archive, entry)) if !archive.is_empty() && !entry.is_empty() => {
                Ok(QuirkRule::new(archive, entry))
            }
            _ => Err(format!("expected ARCHIVE:ENTRY, got '{s}'")),
        }
    }
}

/// Allow-list of (containing archive, entry) pairs with untrusted sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorruptEntryNormalizer {
    rules: Vec<QuirkRule>,
}

impl CorruptEntryNormalizer {
    /// Creates an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    pub fn with_rule(mut self, archive: impl Into<String>, entry: impl Into<String>) -> Self {
        self.rules.push(QuirkRule::new(archive, entry));
        self
    }

    /// Adds a parsed rule.
    pub fn push(&mut self, rule: QuirkRule) {
        self.rules.push(rule);
    }

    /// Returns the configured rules.
    pub fn rules(&self) -> &[QuirkRule] {
        &self.rules
    }

    /// Returns `true` if no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns `true` if `entry` inside `archive` must be re-measured.
    ///
    /// `archive` may be a nesting path or entry name; only its final segment
    /// is compared.
    pub fn matches(&self, archive: &str, entry: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(archive, entry))
    }
}

/// Outcome of re-measuring a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    /// The declared size was right; the entry can be copied verbatim.
    Consistent,
    /// The declared size was wrong.
    Mismatch {
        /// Size stored in the archive.
        declared: u64,
        /// Number of bytes the entry actually decompresses to.
        actual: u64,
    },
}

impl Measurement {
    /// Compares a declared size with a measured length.
    pub fn of(declared: u64, actual: u64) -> Self {
        if declared == actual {
            Measurement::Consistent
        } else {
            Measurement::Mismatch { declared, actual }
        }
    }
}
