//! Batch renaming: numbered, scrambled, keyword substitution and music-name cleanup.
//!
//! All renames happen inside the file's own folder and are recorded in the
//! renamer's [`OperationHistory`] together with the original timestamps when
//! those were asked to be preserved.

use crate::file_category::extension_of;
use crate::file_organizer::{FileTimestamps, OperationHistory, OperationRecord};
use crate::numbering::{NumberingMode, assign_numbers_with_rng, format_number};
use crate::report::{ItemOutcome, OperationReport};
use crate::undo::{UndoManager, UndoReport};
use rand::Rng;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Options for [`Renamer::mass_rename`].
#[derive(Debug, Clone)]
pub struct MassRenameOptions {
    /// Only rename files with this extension and force it onto the new names.
    /// `None`, `""` or `"*"` renames every file and keeps each one's extension.
    pub extension: Option<String>,
    pub prefix: String,
    pub numbering: NumberingMode,
    /// Pad numbers to this many digits; 0 disables padding.
    pub zero_padding: usize,
    pub preserve_timestamps: bool,
    pub dry_run: bool,
}

impl Default for MassRenameOptions {
    fn default() -> Self {
        Self {
            extension: None,
            prefix: String::new(),
            numbering: NumberingMode::Sequential { start: 1 },
            zero_padding: 0,
            preserve_timestamps: false,
            dry_run: false,
        }
    }
}

/// Renames files and remembers how to rename them back.
#[derive(Debug, Default)]
pub struct Renamer {
    history: OperationHistory,
}

impl Renamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The history shared with [`Renamer::undo`].
    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// Renames files to `<prefix><number>.<ext>`, numbered sequentially or scrambled.
    ///
    /// Numbers are paired with files in directory listing order.
    pub fn mass_rename(&self, folder: &Path, options: &MassRenameOptions) -> OperationReport {
        self.mass_rename_with_rng(folder, options, &mut rand::thread_rng())
    }

    /// Like [`Renamer::mass_rename`] with an explicit RNG for scramble mode.
    pub fn mass_rename_with_rng<R: Rng + ?Sized>(
        &self,
        folder: &Path,
        options: &MassRenameOptions,
        rng: &mut R,
    ) -> OperationReport {
        const OP: &str = "mass_rename";
        let forced_extension = options
            .extension
            .as_deref()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty() && ext != "*");

        let files = match &forced_extension {
            Some(ext) => files_with_extensions(folder, std::slice::from_ref(ext)),
            None => list_files(folder),
        };
        let files = match precondition(OP, folder, options.dry_run, files) {
            Ok(files) => files,
            Err(report) => return report,
        };

        info!(
            folder = %folder.display(),
            extension = forced_extension.as_deref().unwrap_or("*"),
            prefix = %options.prefix,
            numbering = ?options.numbering,
            zero_padding = options.zero_padding,
            preserve_timestamps = options.preserve_timestamps,
            dry_run = options.dry_run,
            "mass rename"
        );

        let numbers = match assign_numbers_with_rng(files.len(), options.numbering, rng) {
            Ok(numbers) => numbers,
            Err(e) => {
                error!(folder = %folder.display(), "{e}");
                return OperationReport::aborted(OP, options.dry_run, e);
            }
        };
        let mut report = OperationReport::new(OP, options.dry_run);

        for (old_path, number) in files.iter().zip(numbers) {
            let label = format_number(number, options.zero_padding);
            let suffix = match &forced_extension {
                Some(ext) => format!(".{ext}"),
                None => old_path
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_default(),
            };
            let new_name = format!("{}{}{}", options.prefix, label, suffix);
            report.push(self.rename_one(
                old_path,
                &old_path.with_file_name(new_name),
                options.preserve_timestamps,
                options.dry_run,
            ));
        }

        info!(renamed = report.processed(), "mass rename complete");
        report
    }

    /// Tidies music file names: underscores become spaces and runs of whitespace collapse.
    ///
    /// `extensions` defaults to `mp3` when empty.
    pub fn rename_music(
        &self,
        folder: &Path,
        extensions: &[String],
        dry_run: bool,
        preserve_timestamps: bool,
    ) -> OperationReport {
        const OP: &str = "music_rename";
        let extensions = if extensions.is_empty() {
            vec!["mp3".to_string()]
        } else {
            extensions.to_vec()
        };

        let files = match precondition(OP, folder, dry_run, files_with_extensions(folder, &extensions)) {
            Ok(files) => files,
            Err(report) => return report,
        };

        info!(folder = %folder.display(), ?extensions, dry_run, preserve_timestamps, "music rename");
        let mut report = OperationReport::new(OP, dry_run);

        for old_path in &files {
            let stem = old_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let suffix = old_path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let new_path = old_path.with_file_name(format!("{}{}", cleanup_filename(&stem), suffix));

            if new_path == *old_path {
                report.push(ItemOutcome::skipped(old_path, "name already clean"));
                continue;
            }
            report.push(self.rename_one(old_path, &new_path, preserve_timestamps, dry_run));
        }

        info!(renamed = report.processed(), "music name simplification complete");
        report
    }

    /// Replaces every occurrence of `keyword` in the stems of `*.extension` files.
    ///
    /// Matching is case-sensitive. Files whose stem lacks the keyword are left
    /// out of the report entirely.
    pub fn rename_by_keyword(
        &self,
        folder: &Path,
        extension: &str,
        keyword: &str,
        replacement: &str,
        preserve_timestamps: bool,
        dry_run: bool,
    ) -> OperationReport {
        const OP: &str = "keyword_rename";
        if keyword.is_empty() {
            error!("keyword must not be empty");
            return OperationReport::aborted(OP, dry_run, "keyword must not be empty");
        }

        let extension = extension.trim().trim_start_matches('.').to_lowercase();
        let files = match precondition(
            OP,
            folder,
            dry_run,
            files_with_extensions(folder, std::slice::from_ref(&extension)),
        ) {
            Ok(files) => files,
            Err(report) => return report,
        };

        info!(folder = %folder.display(), extension = %extension, keyword, replacement, preserve_timestamps, dry_run, "keyword rename");
        let mut report = OperationReport::new(OP, dry_run);

        for old_path in &files {
            let stem = old_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !stem.contains(keyword) {
                continue;
            }
            let suffix = old_path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let new_name = format!("{}{}", stem.replace(keyword, replacement), suffix);
            report.push(self.rename_one(
                old_path,
                &old_path.with_file_name(new_name),
                preserve_timestamps,
                dry_run,
            ));
        }

        info!(renamed = report.processed(), "keyword-based renaming complete");
        report
    }

    /// Renames everything back, newest first.
    pub fn undo(&self) -> UndoReport {
        info!("undoing renames");
        UndoManager::undo(&self.history)
    }

    /// Shared per-file policy: dry-run logging, overwrite guard, timestamp
    /// capture and restore, history append.
    fn rename_one(
        &self,
        old_path: &Path,
        new_path: &Path,
        preserve_timestamps: bool,
        dry_run: bool,
    ) -> ItemOutcome {
        if dry_run {
            info!(from = %old_path.display(), to = %new_path.display(), "[DRY RUN] would rename");
            return ItemOutcome::Planned {
                from: old_path.to_path_buf(),
                to: new_path.to_path_buf(),
                label: None,
            };
        }

        if new_path != old_path && fs::symlink_metadata(new_path).is_ok() {
            error!(from = %old_path.display(), to = %new_path.display(), "target exists, not overwriting");
            return ItemOutcome::failed(old_path, "target exists");
        }

        let timestamps = if preserve_timestamps {
            match FileTimestamps::capture(old_path) {
                Ok(stamps) => Some(stamps),
                Err(e) => {
                    error!("{e}");
                    return ItemOutcome::failed(old_path, e);
                }
            }
        } else {
            None
        };

        if let Err(e) = fs::rename(old_path, new_path) {
            error!(from = %old_path.display(), to = %new_path.display(), "rename failed: {e}");
            return ItemOutcome::failed(old_path, e);
        }
        info!(from = %old_path.display(), to = %new_path.display(), "renamed");

        if let Some(stamps) = &timestamps
            && let Err(e) = stamps.apply(new_path)
        {
            warn!("{e}");
        }

        self.history.push(
            OperationRecord::new(new_path.to_path_buf(), old_path.to_path_buf())
                .with_timestamps(timestamps),
        );
        ItemOutcome::Renamed {
            from: old_path.to_path_buf(),
            to: new_path.to_path_buf(),
        }
    }
}

/// Collapses a music file stem: `_` to space, whitespace runs to one space.
pub fn cleanup_filename(stem: &str) -> String {
    stem.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Regular files directly inside `folder`, in listing order.
fn list_files(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)?.flatten() {
        if entry.file_type().is_ok_and(|t| t.is_file()) {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Regular files whose lowercase extension is one of `extensions`.
fn files_with_extensions(folder: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let wanted: HashSet<String> = extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .collect();
    Ok(list_files(folder)?
        .into_iter()
        .filter(|path| wanted.contains(&extension_of(path)))
        .collect())
}

/// Checks the folder listing worked and found something.
fn precondition(
    op: &str,
    folder: &Path,
    dry_run: bool,
    files: io::Result<Vec<PathBuf>>,
) -> Result<Vec<PathBuf>, OperationReport> {
    match files {
        Ok(files) if files.is_empty() => {
            info!(folder = %folder.display(), "no matching files found");
            Err(OperationReport::aborted(op, dry_run, "no matching files found"))
        }
        Ok(files) => Ok(files),
        Err(e) => {
            error!(folder = %folder.display(), "folder does not exist or is not a directory: {e}");
            Err(OperationReport::aborted(
                op,
                dry_run,
                format!("cannot read {}: {e}", folder.display()),
            ))
        }
    }
}
