/// Undo for moves and renames.
///
/// Replays an [`OperationHistory`] newest-first, moving every item back to where
/// it came from. Both the sorter and the renamer undo through here.
use crate::file_organizer::{FileOrganizer, OperationHistory, OperationRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Represents the result of an undo operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of items successfully restored.
    pub restored_files: usize,
    /// Items that could not be moved back; their records stay in history.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Items that were gone; their records are discarded.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Files that occupied an original path and were renamed out of the way.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    /// Returns the total number of records processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Manages undo operations.
pub struct UndoManager;

impl UndoManager {
    /// Pops and reverses every record in `history`, newest first.
    ///
    /// Never fails as a whole:
    /// * **Item missing**: logged as a warning, record discarded
    /// * **Original path occupied**: the occupant is renamed with a timestamp suffix
    /// * **Move back fails**: logged, record kept in history for a later retry
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filetidy::file_organizer::OperationHistory;
    /// use filetidy::undo::UndoManager;
    ///
    /// let history = OperationHistory::new();
    /// let report = UndoManager::undo(&history);
    /// println!("Restored {} items", report.restored_files);
    /// ```
    pub fn undo(history: &OperationHistory) -> UndoReport {
        let mut report = UndoReport::default();
        if history.is_empty() {
            info!("nothing to undo");
            return report;
        }

        info!(records = history.len(), "starting undo");
        let mut retained = Vec::new();

        while let Some(record) = history.pop() {
            match Self::restore(&record, &mut report) {
                Ok(()) => report.restored_files += 1,
                Err(Restore::Missing(reason)) => {
                    warn!(path = %record.resulting_path.display(), "{reason}, cannot undo");
                    report
                        .skipped_files
                        .push((record.resulting_path.clone(), reason));
                }
                Err(Restore::Failed(reason)) => {
                    error!(
                        from = %record.resulting_path.display(),
                        to = %record.original_path.display(),
                        "undo failed: {reason}"
                    );
                    report
                        .failed_restores
                        .push((record.resulting_path.clone(), reason));
                    retained.push(record);
                }
            }
        }

        // Failed records go back oldest-first so a retry replays them in the same order.
        retained.reverse();
        history.extend(retained);

        info!(
            restored = report.restored_files,
            skipped = report.skipped_files.len(),
            failed = report.failed_restores.len(),
            "undo finished"
        );
        report
    }

    fn restore(record: &OperationRecord, report: &mut UndoReport) -> Result<(), Restore> {
        let current = &record.resulting_path;
        let original = &record.original_path;

        if fs::symlink_metadata(current).is_err() {
            return Err(Restore::Missing("item not found at expected location".to_string()));
        }

        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Restore::Failed(format!("could not recreate parent: {e}")))?;
        }

        if original.exists() {
            let backup = Self::generate_backup_path(original);
            fs::rename(original, &backup)
                .map_err(|e| Restore::Failed(format!("could not back up conflicting item: {e}")))?;
            warn!(path = %original.display(), backup = %backup.display(), "original path occupied, backed up");
            report.backups.push(backup);
        }

        FileOrganizer::move_path(current, original).map_err(|e| Restore::Failed(e.to_string()))?;
        info!(from = %current.display(), to = %original.display(), "undo move");

        if let Some(timestamps) = &record.timestamps
            && let Err(e) = timestamps.apply(original)
        {
            warn!("restored {} but not its timestamps: {e}", original.display());
        }

        Ok(())
    }

    /// Backup name for an item in the way: `file.txt` becomes `file.txt.bak.20251109-143052`.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let backup_name = format!("{filename}.bak.{timestamp}");
        match original_path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        }
    }
}

enum Restore {
    Missing(String),
    Failed(String),
}

/// Removes every empty directory under `root` (and `root` itself if it ends
/// up empty), deepest first. Returns how many were removed.
pub fn remove_empty_dirs(root: &Path) -> usize {
    if !root.is_dir() {
        return 0;
    }

    let mut removed = 0;
    let dirs = WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir());

    for entry in dirs {
        let is_empty = fs::read_dir(entry.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            continue;
        }
        match fs::remove_dir(entry.path()) {
            Ok(()) => {
                info!(path = %entry.path().display(), "removed empty folder");
                removed += 1;
            }
            Err(e) => warn!(path = %entry.path().display(), "could not remove folder: {e}"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::{FileTimestamps, TargetClaims};
    use crate::report::ItemOutcome;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn move_and_record(history: &OperationHistory, file: &Path, dest: &Path) -> PathBuf {
        match FileOrganizer::move_into(file, dest, "x", false, &TargetClaims::new()) {
            ItemOutcome::Moved { from, to, .. } => {
                history.push(OperationRecord::new(to.clone(), from));
                to
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_undo_empty_history() {
        let report = UndoManager::undo(&OperationHistory::new());
        assert_eq!(report.total_processed(), 0);
        assert!(report.is_complete_success());
    }

    #[test]
    fn test_undo_multiple_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file1 = base_path.join("image.png");
        let file2 = base_path.join("document.pdf");
        fs::write(&file1, "image data").unwrap();
        fs::write(&file2, "pdf data").unwrap();

        let history = OperationHistory::new();
        move_and_record(&history, &file1, &base_path.join("Images"));
        move_and_record(&history, &file2, &base_path.join("Documents"));

        let report = UndoManager::undo(&history);

        assert_eq!(report.restored_files, 2);
        assert!(report.is_complete_success());
        assert!(file1.exists());
        assert!(file2.exists());
        assert!(history.is_empty());
    }

    #[test]
    fn test_undo_with_missing_file_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let kept = base_path.join("kept.txt");
        let lost = base_path.join("lost.txt");
        fs::write(&kept, "a").unwrap();
        fs::write(&lost, "b").unwrap();

        let history = OperationHistory::new();
        move_and_record(&history, &kept, &base_path.join("Documents"));
        let lost_now = move_and_record(&history, &lost, &base_path.join("Documents"));
        fs::remove_file(&lost_now).unwrap();

        let report = UndoManager::undo(&history);

        assert_eq!(report.restored_files, 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(kept.exists());
        assert!(history.is_empty());
    }

    #[test]
    fn test_undo_backs_up_conflicting_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "original content").unwrap();

        let history = OperationHistory::new();
        move_and_record(&history, &file_path, &base_path.join("Documents"));
        fs::write(&file_path, "new content").unwrap();

        let report = UndoManager::undo(&history);

        assert_eq!(report.restored_files, 1);
        assert_eq!(report.backups.len(), 1);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "original content");
        assert_eq!(fs::read_to_string(&report.backups[0]).unwrap(), "new content");
    }

    #[test]
    fn test_undo_recreates_parent_and_restores_timestamps() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let original = base_path.join("gone").join("song.mp3");
        let current = base_path.join("song.mp3");
        fs::write(&current, "x").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);

        let history = OperationHistory::new();
        history.push(
            OperationRecord::new(current.clone(), original.clone()).with_timestamps(Some(
                FileTimestamps {
                    accessed: old,
                    modified: old,
                },
            )),
        );

        let report = UndoManager::undo(&history);

        assert_eq!(report.restored_files, 1);
        assert!(original.exists());
        assert_eq!(FileTimestamps::capture(&original).unwrap().modified, old);
    }

    #[test]
    fn test_remove_empty_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("sorted");
        fs::create_dir_all(root.join("Images").join("nested")).unwrap();
        fs::create_dir_all(root.join("Documents")).unwrap();
        fs::write(root.join("Documents").join("keep.txt"), "x").unwrap();

        let removed = remove_empty_dirs(&root);

        assert_eq!(removed, 2);
        assert!(!root.join("Images").exists());
        assert!(root.join("Documents").join("keep.txt").exists());
    }
}
