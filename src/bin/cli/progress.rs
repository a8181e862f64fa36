//! Progress display for CLI operations.

use indicatif::{ProgressBar, ProgressStyle};
use jarindex::ArchiveType;
use jarindex::progress::ProgressReporter;

/// Progress display for indexing runs
pub struct CliProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl CliProgress {
    /// Creates a progress bar over `total_artifacts` artifacts
    pub fn new(total_artifacts: u64, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(total_artifacts);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        };

        Self { bar, quiet }
    }

    /// Marks one artifact as done
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Finishes the progress display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn on_level_start(&mut self, archive: &str, archive_type: &ArchiveType, _depth: usize) {
        if self.quiet {
            return;
        }

        // Keep the tail of long nesting paths
        let shown = if archive.len() > 60 {
            let cut = archive.len() - 57;
            let start = (cut..archive.len())
                .find(|&i| archive.is_char_boundary(i))
                .unwrap_or(archive.len());
            format!("...{}", &archive[start..])
        } else {
            archive.to_string()
        };
        self.bar.set_message(format!("{shown} ({archive_type})"));
    }

    fn on_index_built(&mut self, archive: &str, class_count: usize) {
        if !self.quiet {
            self.bar
                .println(format!("  indexed {archive}: {class_count} classes"));
        }
    }

    fn on_warning(&mut self, message: &str) {
        if !self.quiet {
            self.bar.println(format!("  warning: {message}"));
        }
    }
}
