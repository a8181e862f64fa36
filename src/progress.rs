//! Progress reporting for indexing runs.
//!
//! The coordinator reports one event per visited archive level and per
//! completed action. Callbacks have default no-op implementations, so a
//! reporter only overrides what it needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use jarindex::Engine;
//! use jarindex::progress::StatisticsProgress;
//!
//! let mut progress = StatisticsProgress::new();
//! Engine::default().index_artifact_with_progress("app.ear", &mut progress)?;
//! println!(
//!     "{} levels, {} indices built",
//!     progress.state().levels_visited,
//!     progress.state().indices_built
//! );
//! # Ok::<(), jarindex::Error>(())
//! ```

use std::time::{Duration, Instant};

use crate::kind::ArchiveType;

/// IEC byte unit: 1 KiB = 1024 bytes.
pub const BYTES_KIB: u64 = 1024;
/// IEC byte unit: 1 MiB = 1024 KiB.
pub const BYTES_MIB: u64 = 1024 * BYTES_KIB;
/// IEC byte unit: 1 GiB = 1024 MiB.
pub const BYTES_GIB: u64 = 1024 * BYTES_MIB;

/// Observer of an indexing run.
///
/// `archive` arguments are nesting paths such as `app.ear!/lib/b.jar`.
/// `depth` is 0 for the top-level artifact.
pub trait ProgressReporter: Send {
    /// Called when the coordinator opens an archive level.
    fn on_level_start(&mut self, archive: &str, archive_type: &ArchiveType, depth: usize) {
        let _ = (archive, archive_type, depth);
    }

    /// Called when a level is skipped because it already carries an index.
    fn on_already_indexed(&mut self, archive: &str) {
        let _ = archive;
    }

    /// Called after a fresh index was built for a level.
    fn on_index_built(&mut self, archive: &str, class_count: usize) {
        let _ = (archive, class_count);
    }

    /// Called after a level was rewritten.
    fn on_rewritten(&mut self, archive: &str, entries: usize) {
        let _ = (archive, entries);
    }

    /// Called on any warning during processing.
    fn on_warning(&mut self, message: &str) {
        let _ = message;
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for &mut P {
    fn on_level_start(&mut self, archive: &str, archive_type: &ArchiveType, depth: usize) {
        (**self).on_level_start(archive, archive_type, depth);
    }

    fn on_already_indexed(&mut self, archive: &str) {
        (**self).on_already_indexed(archive);
    }

    fn on_index_built(&mut self, archive: &str, class_count: usize) {
        (**self).on_index_built(archive, class_count);
    }

    fn on_rewritten(&mut self, archive: &str, entries: usize) {
        (**self).on_rewritten(archive, entries);
    }

    fn on_warning(&mut self, message: &str) {
        (**self).on_warning(message);
    }
}

/// Counters collected by [`StatisticsProgress`].
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Archive levels opened.
    pub levels_visited: usize,
    /// Deepest nesting level seen.
    pub max_depth: usize,
    /// Levels skipped because they were already indexed.
    pub already_indexed: usize,
    /// Fresh indices built.
    pub indices_built: usize,
    /// Class files fed to indexers.
    pub classes_indexed: usize,
    /// Levels rewritten.
    pub archives_rewritten: usize,
    /// Warnings received.
    pub warnings: Vec<String>,
    /// Processing start time.
    pub start_time: Instant,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            levels_visited: 0,
            max_depth: 0,
            already_indexed: 0,
            indices_built: 0,
            classes_indexed: 0,
            archives_rewritten: 0,
            warnings: Vec::new(),
            start_time: Instant::now(),
        }
    }
}

impl ProgressState {
    /// Creates a new progress state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// No-op progress reporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Progress reporter that tracks statistics.
#[derive(Debug, Default)]
pub struct StatisticsProgress {
    state: ProgressState,
}

impl StatisticsProgress {
    /// Creates a new statistics progress reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_level_start(&mut self, _archive: &str, _archive_type: &ArchiveType, depth: usize) {
        self.state.levels_visited += 1;
        self.state.max_depth = self.state.max_depth.max(depth);
    }

    fn on_already_indexed(&mut self, _archive: &str) {
        self.state.already_indexed += 1;
    }

    fn on_index_built(&mut self, _archive: &str, class_count: usize) {
        self.state.indices_built += 1;
        self.state.classes_indexed += class_count;
    }

    fn on_rewritten(&mut self, _archive: &str, _entries: usize) {
        self.state.archives_rewritten += 1;
    }

    fn on_warning(&mut self, message: &str) {
        self.state.warnings.push(message.to_string());
    }
}

/// Formats a duration as a human-readable string.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    if total_secs < 60 {
        format!("{}.{:01}s", total_secs, duration.subsec_millis() / 100)
    } else if total_secs < 3600 {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h {}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}

/// Formats bytes using IEC binary units (KiB, MiB, GiB).
pub fn format_bytes_iec(bytes: u64) -> String {
    if bytes >= BYTES_GIB {
        format!("{:.2} GiB", bytes as f64 / BYTES_GIB as f64)
    } else if bytes >= BYTES_MIB {
        format!("{:.2} MiB", bytes as f64 / BYTES_MIB as f64)
    } else if bytes >= BYTES_KIB {
        format!("{:.2} KiB", bytes as f64 / BYTES_KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_progress() {
        let mut progress = NoProgress;
        progress.on_level_start("a.jar", &ArchiveType::Jar, 0);
        progress.on_warning("ignored");
    }

    #[test]
    fn test_statistics_progress() {
        let mut progress = StatisticsProgress::new();
        progress.on_level_start("app.ear", &ArchiveType::Ear, 0);
        progress.on_level_start("app.ear!/a.war", &ArchiveType::War, 1);
        progress.on_already_indexed("app.ear!/a.war");
        progress.on_level_start("app.ear!/lib/b.jar", &ArchiveType::Jar, 1);
        progress.on_index_built("app.ear!/lib/b.jar", 3);
        progress.on_rewritten("app.ear", 4);
        progress.on_warning("repaired");

        let state = progress.state();
        assert_eq!(state.levels_visited, 3);
        assert_eq!(state.max_depth, 1);
        assert_eq!(state.already_indexed, 1);
        assert_eq!(state.indices_built, 1);
        assert_eq!(state.classes_indexed, 3);
        assert_eq!(state.archives_rewritten, 1);
        assert_eq!(state.warnings, ["repaired"]);
    }

    #[test]
    fn test_mut_ref_forwards() {
        fn report<P: ProgressReporter>(mut progress: P) {
            progress.on_index_built("a.jar", 2);
        }
        let mut stats = StatisticsProgress::new();
        report(&mut stats);
        assert_eq!(stats.state().indices_built, 1);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3700)), "1h 1m");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes_iec(512), "512 B");
        assert_eq!(format_bytes_iec(1536), "1.50 KiB");
        assert_eq!(format_bytes_iec(BYTES_MIB), "1.00 MiB");
    }
}
