//! Per-item outcomes and the report returned by every public operation.
//!
//! Each outcome is logged when it happens as well; the report lets callers
//! and tests inspect results without scraping log output.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What happened to one file or folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Moved into a category or title folder.
    Moved {
        from: PathBuf,
        to: PathBuf,
        /// Category or title folder the item went into.
        label: String,
    },
    /// Renamed in place.
    Renamed { from: PathBuf, to: PathBuf },
    /// Dry run: the action that would have been taken.
    Planned {
        from: PathBuf,
        to: PathBuf,
        label: Option<String>,
    },
    /// Deliberately left alone.
    Skipped { path: PathBuf, reason: String },
    /// Attempted and failed.
    Failed { path: PathBuf, reason: String },
}

impl ItemOutcome {
    pub fn failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Failed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn skipped(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Skipped {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for outcomes that changed the filesystem.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Moved { .. } | Self::Renamed { .. })
    }
}

/// Result of one sort or rename invocation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    /// Short operation name, e.g. `sort` or `mass_rename`.
    pub operation: String,
    pub dry_run: bool,
    /// Set when a precondition failed and nothing was attempted.
    pub aborted: Option<String>,
    pub outcomes: Vec<ItemOutcome>,
}

impl OperationReport {
    pub fn new(operation: &str, dry_run: bool) -> Self {
        Self {
            operation: operation.to_string(),
            dry_run,
            aborted: None,
            outcomes: Vec::new(),
        }
    }

    /// A report for an operation that stopped before touching anything.
    pub fn aborted(operation: &str, dry_run: bool, reason: impl ToString) -> Self {
        Self {
            aborted: Some(reason.to_string()),
            ..Self::new(operation, dry_run)
        }
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    /// Number of items moved or renamed.
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn planned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Planned { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Skipped { .. }))
            .count()
    }

    pub fn failures(&self) -> Vec<&ItemOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Failed { .. }))
            .collect()
    }

    /// Items processed: applied, or planned when this was a dry run.
    pub fn processed(&self) -> usize {
        self.applied() + self.planned()
    }

    /// Count of moved or planned items per destination label.
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            let label = match outcome {
                ItemOutcome::Moved { label, .. } => Some(label.as_str()),
                ItemOutcome::Planned {
                    label: Some(label), ..
                } => Some(label.as_str()),
                _ => None,
            };
            if let Some(label) = label {
                *counts.entry(label.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Destination of the item that started at `from`, if it was moved, renamed or planned.
    pub fn destination_of(&self, from: &std::path::Path) -> Option<&PathBuf> {
        self.outcomes.iter().find_map(|outcome| match outcome {
            ItemOutcome::Moved { from: f, to, .. }
            | ItemOutcome::Renamed { from: f, to }
            | ItemOutcome::Planned { from: f, to, .. }
                if f == from =>
            {
                Some(to)
            }
            _ => None,
        })
    }
}
