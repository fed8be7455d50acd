//! Clusters items whose normalized titles match into a shared folder.
//!
//! Runs before category classification. Any title shared by two or more items
//! becomes `dest_root/<Title>`; single items are left for classification.

use crate::file_organizer::{OperationHistory, OperationRecord, TargetClaims, FileOrganizer};
use crate::report::ItemOutcome;
use crate::title::title_for_path;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Knobs for one grouping pass.
#[derive(Debug, Clone, Copy)]
pub struct GroupingOptions {
    pub dry_run: bool,
    /// When false only folders are grouped.
    pub group_files: bool,
}

/// What a grouping pass did.
#[derive(Debug, Default)]
pub struct GroupingResult {
    /// Source paths that were moved (or, in a dry run, planned) into a title folder.
    pub handled: HashSet<PathBuf>,
    pub outcomes: Vec<ItemOutcome>,
    /// Number of title folders with two or more members.
    pub groups: usize,
    /// The `dest_root/<Title>` folders, whether or not they exist yet.
    pub folders: HashSet<PathBuf>,
}

/// Buckets `items` by title, keeping only titles shared by at least two items.
///
/// Members keep their input order; titles are returned in sorted order.
pub fn collect_groups(items: &[PathBuf], group_files: bool) -> BTreeMap<String, Vec<PathBuf>> {
    let mut buckets: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for item in items {
        let is_dir = item.is_dir();
        if !is_dir && !group_files {
            continue;
        }
        let title = title_for_path(item, is_dir);
        if title.is_empty() {
            debug!(path = %item.display(), "no usable title, not grouping");
            continue;
        }
        buckets.entry(title).or_default().push(item.clone());
    }

    buckets.retain(|_, members| members.len() >= 2);
    buckets
}

/// Moves every multi-member title group into `dest_root/<Title>`.
///
/// Moves run one at a time while holding `lock`, which the caller shares with
/// everything else that mutates the destination. A failing member is logged
/// and the rest of its group still moves.
pub fn group_similar_items(
    items: &[PathBuf],
    dest_root: &Path,
    options: GroupingOptions,
    history: &OperationHistory,
    claims: &TargetClaims,
    lock: &Mutex<()>,
) -> GroupingResult {
    let groups = collect_groups(items, options.group_files);
    let mut result = GroupingResult {
        groups: groups.len(),
        ..Default::default()
    };

    for (title, members) in &groups {
        let folder = dest_root.join(title);
        result.folders.insert(folder.clone());
        info!(title = %title, members = members.len(), folder = %folder.display(), "grouping similar items");

        for member in members {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let outcome = FileOrganizer::move_into(member, &folder, title, options.dry_run, claims);
            match &outcome {
                ItemOutcome::Moved { from, to, .. } => {
                    history.push(OperationRecord::new(to.clone(), from.clone()));
                    result.handled.insert(from.clone());
                }
                ItemOutcome::Planned { from, .. } => {
                    result.handled.insert(from.clone());
                }
                _ => {}
            }
            result.outcomes.push(outcome);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_only_shared_titles_form_groups() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        let items = vec![
            touch(src, "Show.Name.S01E01.720p.mkv"),
            touch(src, "Show.Name.S01E02.720p.mkv"),
            touch(src, "Show Name - S01E03.mkv"),
            touch(src, "Other.Movie.2019.mkv"),
        ];

        let groups = collect_groups(&items, true);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Show Name"].len(), 3);
    }

    #[test]
    fn test_files_ignored_when_group_files_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        let items = vec![
            touch(src, "Show.Name.S01E01.mkv"),
            touch(src, "Show.Name.S01E02.mkv"),
        ];

        assert!(collect_groups(&items, false).is_empty());
    }

    #[test]
    fn test_group_moves_members_and_records_history() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dest");
        fs::create_dir(&src).unwrap();
        let items = vec![
            touch(&src, "Show.Name.S01E01.mkv"),
            touch(&src, "Show.Name.S01E02.mkv"),
            touch(&src, "lonely.txt"),
        ];
        let history = OperationHistory::new();

        let result = group_similar_items(
            &items,
            &dest,
            GroupingOptions {
                dry_run: false,
                group_files: true,
            },
            &history,
            &TargetClaims::new(),
            &Mutex::new(()),
        );

        assert_eq!(result.groups, 1);
        assert!(result.folders.contains(&dest.join("Show Name")));
        assert_eq!(result.handled.len(), 2);
        assert_eq!(history.len(), 2);
        assert!(dest.join("Show Name").join("Show.Name.S01E01.mkv").exists());
        assert!(dest.join("Show Name").join("Show.Name.S01E02.mkv").exists());
        assert!(src.join("lonely.txt").exists());
    }

    #[test]
    fn test_dry_run_plans_without_history() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        let items = vec![
            touch(src, "[Grp] Anime Title - 01.mkv"),
            touch(src, "[Grp] Anime Title - 02.mkv"),
        ];
        let history = OperationHistory::new();

        let result = group_similar_items(
            &items,
            &src.join("out"),
            GroupingOptions {
                dry_run: true,
                group_files: true,
            },
            &history,
            &TargetClaims::new(),
            &Mutex::new(()),
        );

        assert_eq!(result.handled.len(), 2);
        assert!(history.is_empty());
        assert!(!src.join("out").exists());
        assert!(items.iter().all(|p| p.exists()));
    }
}
