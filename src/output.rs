//! Output formatting and styling module.
//!
//! Human-facing summaries printed by the CLI after an operation finishes.
//! Engine progress itself goes through `tracing`; this module only renders
//! the final reports.

use crate::report::{ItemOutcome, OperationReport};
use crate::undo::UndoReport;
use colored::*;
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints a table of item counts per destination folder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filetidy::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(label_counts: &BTreeMap<String, usize>, total: usize) {
        Self::header("SUMMARY");

        let width = label_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(11); // "Destination"

        println!(
            "{:<width$} | {}",
            "Destination".bold(),
            "Items".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (label, count) in label_counts {
            println!(
                "{:<width$} | {} {}",
                label,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );
    }

    /// Prints the outcome of a sort or rename.
    pub fn operation_summary(report: &OperationReport) {
        if let Some(reason) = &report.aborted {
            Self::error(&format!("{} did not run: {}", report.operation, reason));
            return;
        }

        let counts = report.label_counts();
        if !counts.is_empty() {
            Self::summary_table(&counts, report.processed());
        }

        let failures = report.failures();
        if !failures.is_empty() {
            Self::header("FAILURES");
            for failure in &failures {
                if let ItemOutcome::Failed { path, reason } = failure {
                    Self::error(&format!("{}: {}", path.display(), reason));
                }
            }
        }

        let processed = report.processed();
        if report.dry_run {
            Self::dry_run_notice(&format!(
                "{} {} would be processed. No files were modified.",
                processed,
                plural(processed)
            ));
        } else if failures.is_empty() {
            Self::success(&format!("{} {} processed.", processed, plural(processed)));
        } else {
            Self::warning(&format!(
                "{} {} processed, {} failed. See the log for details.",
                processed,
                plural(processed),
                failures.len()
            ));
        }
    }

    /// Prints the outcome of an undo.
    pub fn undo_summary(name: &str, report: &UndoReport) {
        if report.total_processed() == 0 {
            Self::warning(&format!("Nothing to undo for {name}."));
            return;
        }

        Self::success(&format!(
            "Undo {name}: restored {}",
            report.restored_files
        ));
        for backup in &report.backups {
            Self::warning(&format!("Backed up conflicting item to {}", backup.display()));
        }
        for (path, reason) in &report.skipped_files {
            Self::warning(&format!("Skipped {}: {}", path.display(), reason));
        }
        for (path, reason) in &report.failed_restores {
            Self::error(&format!("Failed {}: {}", path.display(), reason));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "item" } else { "items" }
}
