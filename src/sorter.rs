//! The sort orchestrator.
//!
//! One call to [`FileSorter::sort_directory`] scans the top level of a source
//! directory, moves title groups into shared folders, then classifies and moves
//! everything else on a bounded worker pool. Every move lands in the sorter's
//! own [`OperationHistory`] so [`FileSorter::undo`] can put it all back.

use crate::config::{AppConfig, CompiledFilters, ConfigError, SorterSettings};
use crate::file_category::{CategoryRules, Classifier, EMPTY_FOLDERS};
use crate::file_organizer::{FileOrganizer, OperationHistory, OperationRecord, TargetClaims};
use crate::grouping::{GroupingOptions, group_similar_items};
use crate::report::{ItemOutcome, OperationReport};
use crate::undo::{UndoManager, UndoReport, remove_empty_dirs};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Per-call options. Passed by value and never changed while a sort runs.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Log what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Only run title grouping; skip per-item classification.
    pub series_mode: bool,
    /// Let plain files take part in grouping (folders always do).
    pub group_files: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            series_mode: false,
            group_files: true,
        }
    }
}

impl SortOptions {
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn series_mode(mut self, series_mode: bool) -> Self {
        self.series_mode = series_mode;
        self
    }

    pub fn group_files(mut self, group_files: bool) -> Self {
        self.group_files = group_files;
        self
    }
}

/// Sorts directories into category and title folders.
pub struct FileSorter {
    classifier: Classifier,
    filters: CompiledFilters,
    workers: usize,
    history: OperationHistory,
    claims: TargetClaims,
    move_lock: Mutex<()>,
}

impl FileSorter {
    /// A sorter with the given rules and default settings.
    pub fn new(rules: CategoryRules) -> Self {
        Self::with_settings(rules, &SorterSettings::default(), CompiledFilters::default())
    }

    pub fn with_settings(
        rules: CategoryRules,
        settings: &SorterSettings,
        filters: CompiledFilters,
    ) -> Self {
        Self {
            classifier: Classifier::with_sample_limit(rules, settings.folder_sample_limit),
            filters,
            workers: settings.workers.max(1),
            history: OperationHistory::new(),
            claims: TargetClaims::new(),
            move_lock: Mutex::new(()),
        }
    }

    /// Builds a sorter from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured filter patterns do not compile.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_settings(
            config.category_rules(),
            &config.sorter,
            config.compile_filters()?,
        ))
    }

    /// The history shared with [`FileSorter::undo`].
    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// Sorts the top level of `source` into `dest`.
    ///
    /// Never fails as a whole; a missing source aborts with a logged error and
    /// per-item problems are logged and reported individually.
    pub fn sort_directory(&self, source: &Path, dest: &Path, options: SortOptions) -> OperationReport {
        if !source.is_dir() {
            error!(source = %source.display(), "source path does not exist or is not a directory");
            return OperationReport::aborted(
                "sort",
                options.dry_run,
                format!("source path does not exist: {}", source.display()),
            );
        }

        info!(
            source = %source.display(),
            dest = %dest.display(),
            dry_run = options.dry_run,
            series_mode = options.series_mode,
            "sorting"
        );
        let mut report = OperationReport::new("sort", options.dry_run);

        let candidates = match self.scan(source, dest) {
            Ok(items) => items,
            Err(e) => {
                error!(source = %source.display(), "could not list source: {e}");
                return OperationReport::aborted("sort", options.dry_run, e);
            }
        };

        let grouping = group_similar_items(
            &candidates,
            dest,
            GroupingOptions {
                dry_run: options.dry_run,
                group_files: options.group_files,
            },
            &self.history,
            &self.claims,
            &self.move_lock,
        );
        report.outcomes.extend(grouping.outcomes);

        if options.series_mode {
            info!(groups = grouping.groups, "series mode, skipping classification");
            return report;
        }

        // Sorting in place puts the title folders next to the items still to classify.
        let title_folders: HashSet<PathBuf> = grouping
            .folders
            .iter()
            .filter_map(|folder| std::path::absolute(folder).ok())
            .collect();
        let remaining: Vec<PathBuf> = match self.scan(source, dest) {
            Ok(items) => items
                .into_iter()
                .filter(|item| !grouping.handled.contains(item))
                .filter(|item| {
                    std::path::absolute(item).map_or(true, |abs| !title_folders.contains(&abs))
                })
                .collect(),
            Err(e) => {
                error!(source = %source.display(), "could not re-list source: {e}");
                return report;
            }
        };

        let outcomes = self.classify_and_move(&remaining, dest, options.dry_run);
        self.history.extend(outcomes.iter().filter_map(|outcome| match outcome {
            ItemOutcome::Moved { from, to, .. } => {
                Some(OperationRecord::new(to.clone(), from.clone()))
            }
            _ => None,
        }));
        report.outcomes.extend(outcomes);

        info!(
            processed = report.processed(),
            failed = report.failures().len(),
            "sorting complete"
        );
        report
    }

    /// Non-recursive listing of `source`, minus filtered entries and the destination itself.
    fn scan(&self, source: &Path, dest: &Path) -> io::Result<Vec<PathBuf>> {
        let dest_abs = std::path::absolute(dest)?;
        let mut items = Vec::new();

        for entry in fs::read_dir(source)?.flatten() {
            let path = entry.path();
            if !self.filters.should_include(&path) {
                debug!(path = %path.display(), "excluded by filters");
                continue;
            }
            let path_abs = std::path::absolute(&path)?;
            if dest_abs.starts_with(&path_abs) {
                debug!(path = %path.display(), "destination lives here, not sorting it");
                continue;
            }
            items.push(path);
        }
        Ok(items)
    }

    /// Fans the per-item work out over the worker pool and collects results in input order.
    fn classify_and_move(&self, items: &[PathBuf], dest: &Path, dry_run: bool) -> Vec<ItemOutcome> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(|| {
                items
                    .par_iter()
                    .map(|item| self.sort_item(item, dest, dry_run))
                    .collect()
            }),
            Err(e) => {
                warn!("could not start worker pool, sorting sequentially: {e}");
                items
                    .iter()
                    .map(|item| self.sort_item(item, dest, dry_run))
                    .collect()
            }
        }
    }

    fn sort_item(&self, item: &Path, dest: &Path, dry_run: bool) -> ItemOutcome {
        let metadata = match fs::symlink_metadata(item) {
            Ok(metadata) => metadata,
            Err(e) => {
                error!(path = %item.display(), "item vanished before it could be sorted: {e}");
                return ItemOutcome::failed(item, e);
            }
        };

        let category = if metadata.is_dir() {
            self.classifier
                .classify_folder(item)
                .unwrap_or_else(|| EMPTY_FOLDERS.to_string())
        } else {
            self.classifier.classify_file(item)
        };

        FileOrganizer::move_into(item, &dest.join(&category), &category, dry_run, &self.claims)
    }

    /// Reverses every recorded move, newest first.
    pub fn undo(&self) -> UndoReport {
        info!("undoing sort");
        UndoManager::undo(&self.history)
    }

    /// Undoes, then removes folders under `dest` that the undo left empty.
    pub fn undo_and_prune(&self, dest: &Path) -> (UndoReport, usize) {
        let report = self.undo();
        let removed = remove_empty_dirs(dest);
        (report, removed)
    }
}
