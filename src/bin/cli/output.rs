//! Output formatting for CLI operations.

use jarindex::index::ClassSummaryIndex;
use jarindex::progress::format_bytes_iec;
use jarindex::{IndexReport, IndexStatus, RecursionOutcome};
use serde_json::{Value, json};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the reports of an indexing run
    fn format_reports(&self, reports: &[IndexReport]) -> String;

    /// Formats a dry-run outcome tree
    fn format_outcome(&self, outcome: &RecursionOutcome) -> String;

    /// Formats a decoded index
    fn format_index(&self, source: &str, size: u64, index: &ClassSummaryIndex) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl HumanFormatter {
    fn tree(outcome: &RecursionOutcome) -> String {
        let mut output = String::new();
        for (depth, level) in outcome.walk() {
            let mark = if level.changed() { '*' } else { ' ' };
            output.push_str(&format!(
                "{mark} {:indent$}{} [{}] {}\n",
                "",
                level.name(),
                level.archive_type(),
                describe_status(level.index()),
                indent = depth * 2
            ));
        }
        output
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_reports(&self, reports: &[IndexReport]) -> String {
        let mut output = String::new();
        let mut changed = 0;

        for report in reports {
            output.push_str(&format!("{}\n", report.artifact.display()));
            output.push_str(&Self::tree(&report.outcome));
            for path in &report.written {
                output.push_str(&format!("  -> {}\n", path.display()));
            }
            if report.changed() {
                changed += 1;
            }
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} artifact(s), {} changed, {} unchanged\n",
            reports.len(),
            changed,
            reports.len() - changed
        ));
        output
    }

    fn format_outcome(&self, outcome: &RecursionOutcome) -> String {
        let mut output = Self::tree(outcome);
        let summary = outcome.summary();
        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} level(s), depth {}, {} to index, {} already indexed\n",
            summary.levels, summary.max_depth, summary.indices_pending, summary.already_indexed
        ));
        if outcome.changed() {
            output.push_str("Indexing would change this artifact\n");
        } else {
            output.push_str("Nothing to do\n");
        }
        output
    }

    fn format_index(&self, source: &str, size: u64, index: &ClassSummaryIndex) -> String {
        let mut output = format!(
            "Index: {} ({}, {} classes)\n",
            source,
            format_bytes_iec(size),
            index.len()
        );
        output.push_str(&"-".repeat(70));
        output.push('\n');
        for class in index.classes() {
            output.push_str(&class.name);
            if let Some(super_name) = &class.super_name {
                output.push_str(&format!(" extends {super_name}"));
            }
            if !class.interfaces.is_empty() {
                output.push_str(&format!(" implements {}", class.interfaces.join(", ")));
            }
            output.push('\n');
        }
        output
    }
}

fn describe_status(status: &IndexStatus) -> String {
    match status {
        IndexStatus::Pending { class_entries } => format!("to index ({class_entries} classes)"),
        IndexStatus::Built(artifact) => format!("indexed ({} classes)", artifact.class_count()),
        other => other.as_str().to_string(),
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl JsonFormatter {
    fn outcome_value(outcome: &RecursionOutcome) -> Value {
        json!({
            "name": outcome.name(),
            "type": outcome.archive_type().to_string(),
            "index": outcome.index().as_str(),
            "classes": outcome.index().class_count(),
            "changed": outcome.changed(),
            "children": outcome.children().iter().map(|child| json!({
                "entry": child.entry,
                "replaced": child.replaced,
                "sibling_index": child.sibling_index,
                "outcome": Self::outcome_value(&child.outcome),
            })).collect::<Vec<_>>(),
        })
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_reports(&self, reports: &[IndexReport]) -> String {
        let items: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "artifact": r.artifact.display().to_string(),
                    "changed": r.changed(),
                    "written": r.written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
                    "outcome": Self::outcome_value(&r.outcome),
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_outcome(&self, outcome: &RecursionOutcome) -> String {
        let summary = outcome.summary();
        let obj = json!({
            "changed": outcome.changed(),
            "summary": {
                "levels": summary.levels,
                "max_depth": summary.max_depth,
                "changed_levels": summary.changed_levels,
                "indices_pending": summary.indices_pending,
                "already_indexed": summary.already_indexed,
            },
            "outcome": Self::outcome_value(outcome),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_index(&self, source: &str, size: u64, index: &ClassSummaryIndex) -> String {
        let obj = json!({
            "source": source,
            "size": size,
            "class_count": index.len(),
            "classes": index.classes().iter().map(|c| json!({
                "name": c.name,
                "super": c.super_name,
                "interfaces": c.interfaces,
                "access_flags": c.access_flags,
                "major_version": c.major_version,
                "minor_version": c.minor_version,
            })).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
