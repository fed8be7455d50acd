/// Filesystem moves with collision handling, and the history that makes them undoable.
///
/// Every successful move or rename produces an [`OperationRecord`]; records are
/// kept in an [`OperationHistory`] owned by the orchestrator that made them and
/// replayed in reverse by [`crate::undo::UndoManager`].
use crate::report::ItemOutcome;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{error, info};
use walkdir::WalkDir;

/// Errors that can occur while moving, renaming or restoring files.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {error}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    /// Failed to move or rename an item.
    #[error("Failed to move {} to {}: {error}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    /// A path that should exist does not.
    #[error("Path does not exist: {}", path.display())]
    MissingPath { path: PathBuf },
    /// The path has no final name component.
    #[error("Path has no file name: {}", path.display())]
    InvalidName { path: PathBuf },
    /// Reading or writing access/modification times failed.
    #[error("Failed to access timestamps of {}: {error}", path.display())]
    TimestampFailed {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Access and modification times captured before a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimestamps {
    pub accessed: SystemTime,
    pub modified: SystemTime,
}

impl FileTimestamps {
    /// Reads the current times of `path`.
    pub fn capture(path: &Path) -> OrganizeResult<Self> {
        let metadata = fs::metadata(path).map_err(|error| OrganizeError::TimestampFailed {
            path: path.to_path_buf(),
            error,
        })?;
        let to_err = |error| OrganizeError::TimestampFailed {
            path: path.to_path_buf(),
            error,
        };
        Ok(Self {
            accessed: metadata.accessed().map_err(to_err)?,
            modified: metadata.modified().map_err(to_err)?,
        })
    }

    /// Writes these times back onto the file at `path`.
    pub fn apply(&self, path: &Path) -> OrganizeResult<()> {
        let to_err = |error| OrganizeError::TimestampFailed {
            path: path.to_path_buf(),
            error,
        };
        let file = open_for_times(path).map_err(to_err)?;
        let times = FileTimes::new()
            .set_accessed(self.accessed)
            .set_modified(self.modified);
        file.set_times(times).map_err(to_err)
    }
}

/// Opens `path` without write access so read-only files can still have
/// their times set.
#[cfg(not(windows))]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    File::options()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)
}

/// One reversible move or rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    /// Where the item lives now.
    pub resulting_path: PathBuf,
    /// Where it came from.
    pub original_path: PathBuf,
    /// Times to restore on undo, when they were captured.
    pub timestamps: Option<FileTimestamps>,
}

impl OperationRecord {
    pub fn new(resulting_path: PathBuf, original_path: PathBuf) -> Self {
        Self {
            resulting_path,
            original_path,
            timestamps: None,
        }
    }

    pub fn with_timestamps(mut self, timestamps: Option<FileTimestamps>) -> Self {
        self.timestamps = timestamps;
        self
    }
}

/// Ordered, shareable log of operations. Cloning shares the same log.
#[derive(Debug, Clone, Default)]
pub struct OperationHistory {
    records: Arc<Mutex<Vec<OperationRecord>>>,
}

impl OperationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OperationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, record: OperationRecord) {
        self.lock().push(record);
    }

    /// Appends several records while holding the lock once.
    pub fn extend(&self, records: impl IntoIterator<Item = OperationRecord>) {
        self.lock().extend(records);
    }

    /// Removes and returns the most recent record.
    pub fn pop(&self) -> Option<OperationRecord> {
        self.lock().pop()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Destination paths with a move in flight.
///
/// Concurrent movers reserve their target here before moving, so two items
/// with the same name never pick the same free slot.
#[derive(Debug, Default)]
pub struct TargetClaims {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl TargetClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the first free `name`, `stem_1.ext`, `stem_2.ext`, ... in `dest_folder`
    /// and reserves it.
    pub fn claim(&self, dest_folder: &Path, name: &OsStr) -> PathBuf {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let target = FileOrganizer::unique_target(dest_folder, name, |candidate| {
            claimed.contains(candidate)
        });
        claimed.insert(target.clone());
        target
    }

    /// Drops a reservation once the move has finished (or failed); from then on
    /// the filesystem itself says whether the name is taken.
    pub fn release(&self, target: &Path) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(target);
    }
}

/// Moves items into destination folders.
pub struct FileOrganizer;

impl FileOrganizer {
    /// First non-existing path of the form `name`, `stem_1.ext`, `stem_2.ext`, ...
    ///
    /// `taken` lets callers mark extra paths as unavailable.
    pub fn unique_target(
        dest_folder: &Path,
        name: &OsStr,
        taken: impl Fn(&Path) -> bool,
    ) -> PathBuf {
        let target = dest_folder.join(name);
        if !target.exists() && !taken(&target) {
            return target;
        }

        let name_path = Path::new(name);
        let stem = name_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = name_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut counter = 1u32;
        loop {
            let candidate = dest_folder.join(format!("{stem}_{counter}{suffix}"));
            if !candidate.exists() && !taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Moves `from` to `to`, renaming when possible and copying across volumes.
    pub fn move_path(from: &Path, to: &Path) -> OrganizeResult<()> {
        let move_err = |error| OrganizeError::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error,
        };

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                Self::copy_then_remove(from, to).map_err(move_err)
            }
            Err(e) => Err(move_err(e)),
        }
    }

    fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
        if from.is_dir() {
            for entry in WalkDir::new(from) {
                let entry = entry.map_err(io::Error::other)?;
                let relative = entry
                    .path()
                    .strip_prefix(from)
                    .map_err(io::Error::other)?;
                let target = to.join(relative);
                if entry.file_type().is_dir() {
                    fs::create_dir_all(&target)?;
                } else {
                    fs::copy(entry.path(), &target)?;
                }
            }
            fs::remove_dir_all(from)
        } else {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }

    /// Moves one item into `dest_folder`, creating the folder if needed.
    ///
    /// Name collisions get a `_N` suffix. A dry run never looks at the
    /// destination: it always proposes the bare target name and touches nothing.
    /// Errors are logged and reported as [`ItemOutcome::Failed`], never raised.
    pub fn move_into(
        item: &Path,
        dest_folder: &Path,
        label: &str,
        dry_run: bool,
        claims: &TargetClaims,
    ) -> ItemOutcome {
        let Some(name) = item.file_name() else {
            let err = OrganizeError::InvalidName {
                path: item.to_path_buf(),
            };
            error!("{err}");
            return ItemOutcome::failed(item, err);
        };

        if dry_run {
            let target = dest_folder.join(name);
            info!(from = %item.display(), to = %target.display(), label, "[DRY RUN] would move");
            return ItemOutcome::Planned {
                from: item.to_path_buf(),
                to: target,
                label: Some(label.to_string()),
            };
        }

        if let Err(error) = fs::create_dir_all(dest_folder) {
            let err = OrganizeError::DirectoryCreationFailed {
                path: dest_folder.to_path_buf(),
                error,
            };
            error!("{err}");
            return ItemOutcome::failed(item, err);
        }

        let target = claims.claim(dest_folder, name);
        let moved = Self::move_path(item, &target);
        claims.release(&target);
        match moved {
            Ok(()) => {
                info!(from = %item.display(), to = %target.display(), label, "moved");
                ItemOutcome::Moved {
                    from: item.to_path_buf(),
                    to: target,
                    label: label.to_string(),
                }
            }
            Err(err) => {
                error!("{err}");
                ItemOutcome::failed(item, err)
            }
        }
    }
}
