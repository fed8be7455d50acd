//! Extension-based classification of files and folders.
//!
//! Categories are an ordered list of `(name, extension set)` pairs. Lookups walk
//! the list in order and the first category containing the extension wins;
//! nothing matching means [`OTHERS`].
//!
//! # Examples
//!
//! ```
//! use filetidy::file_category::{CategoryRules, Classifier};
//! use std::path::Path;
//!
//! let classifier = Classifier::new(CategoryRules::default());
//! assert_eq!(classifier.classify_file(Path::new("holiday.JPG")), "Images");
//! assert_eq!(classifier.classify_file(Path::new("notes.xyz")), "Others");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Category used when no rule matches.
pub const OTHERS: &str = "Others";

/// Category used for folders that contain no files.
pub const EMPTY_FOLDERS: &str = "EmptyFolders";

/// Default number of files sampled when classifying a folder.
pub const DEFAULT_FOLDER_SAMPLE_LIMIT: usize = 51;

/// One category as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category name, also used as the destination folder name.
    pub name: String,
    /// Extensions belonging to this category, with or without a leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// A normalized category: lowercase extensions without leading dots.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    extensions: HashSet<String>,
}

impl Category {
    /// Returns true if `extension` (already lowercase, no dot) belongs here.
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }
}

/// Immutable, ordered category rules.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    categories: Vec<Category>,
}

impl CategoryRules {
    /// Builds the rule set, normalizing every extension.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let categories = rules
            .into_iter()
            .map(|rule| Category {
                name: rule.name,
                extensions: rule
                    .extensions
                    .iter()
                    .map(|ext| normalize_extension(ext))
                    .filter(|ext| !ext.is_empty())
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    /// Iterates categories in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Maps an extension to a category name, first match wins.
    pub fn category_for_extension(&self, extension: &str) -> &str {
        let extension = normalize_extension(extension);
        self.categories
            .iter()
            .find(|category| category.contains(&extension))
            .map(|category| category.name.as_str())
            .unwrap_or(OTHERS)
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new("Images", &["jpg", "jpeg", "png", "gif"]),
            CategoryRule::new("Documents", &["pdf", "doc", "docx", "txt", "xls", "xlsx"]),
            CategoryRule::new("Audio", &["mp3", "wav", "ogg"]),
            CategoryRule::new("Video", &["mp4", "mov", "avi"]),
            CategoryRule::new("Archives", &["zip", "rar", "7z"]),
        ])
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Lowercase extension of `path` without the dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Maps files and folders to category names.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: CategoryRules,
    folder_sample_limit: usize,
}

impl Classifier {
    pub fn new(rules: CategoryRules) -> Self {
        Self::with_sample_limit(rules, DEFAULT_FOLDER_SAMPLE_LIMIT)
    }

    pub fn with_sample_limit(rules: CategoryRules, folder_sample_limit: usize) -> Self {
        Self {
            rules,
            folder_sample_limit: folder_sample_limit.max(1),
        }
    }

    /// Classifies a single file by its extension.
    ///
    /// Files without any extension are sniffed with `infer`; a file that has an
    /// extension is never sniffed, so unknown extensions always land in
    /// [`OTHERS`].
    pub fn classify_file(&self, path: &Path) -> String {
        let extension = extension_of(path);
        if !extension.is_empty() {
            return self.rules.category_for_extension(&extension).to_string();
        }

        match infer::get_from_path(path) {
            Ok(Some(kind)) => {
                debug!(path = %path.display(), detected = kind.extension(), "sniffed content type");
                self.rules.category_for_extension(kind.extension()).to_string()
            }
            _ => OTHERS.to_string(),
        }
    }

    /// Classifies a folder by the most common extension among a sample of its files.
    ///
    /// Walks at most `folder_sample_limit` files (recursively, in walk order).
    /// Ties go to the extension seen first. Returns `None` when no file was found.
    pub fn classify_folder(&self, path: &Path) -> Option<String> {
        let mut tally: Vec<(String, usize)> = Vec::new();

        let files = WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .take(self.folder_sample_limit);

        for entry in files {
            let extension = extension_of(entry.path());
            match tally.iter_mut().find(|(ext, _)| *ext == extension) {
                Some((_, count)) => *count += 1,
                None => tally.push((extension, 1)),
            }
        }

        let mut dominant: Option<&(String, usize)> = None;
        for candidate in &tally {
            if dominant.is_none_or(|(_, best)| candidate.1 > *best) {
                dominant = Some(candidate);
            }
        }

        dominant.map(|(extension, _)| self.rules.category_for_extension(extension).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_file_by_extension() {
        let classifier = Classifier::new(CategoryRules::default());
        assert_eq!(classifier.classify_file(Path::new("a.png")), "Images");
        assert_eq!(classifier.classify_file(Path::new("a.PDF")), "Documents");
        assert_eq!(classifier.classify_file(Path::new("a.ogg")), "Audio");
        assert_eq!(classifier.classify_file(Path::new("a.mov")), "Video");
        assert_eq!(classifier.classify_file(Path::new("a.7z")), "Archives");
    }

    #[test]
    fn test_unknown_extension_is_others() {
        let classifier = Classifier::new(CategoryRules::default());
        assert_eq!(classifier.classify_file(Path::new("a.xyz")), OTHERS);
    }

    #[test]
    fn test_first_matching_category_wins() {
        let rules = CategoryRules::new(vec![
            CategoryRule::new("Scans", &["pdf"]),
            CategoryRule::new("Documents", &["pdf", "txt"]),
        ]);
        assert_eq!(rules.category_for_extension("pdf"), "Scans");
        assert_eq!(rules.category_for_extension(".TXT"), "Documents");
    }

    #[test]
    fn test_extensionless_file_is_sniffed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("mystery");
        fs::write(
            &path,
            [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D],
        )
        .unwrap();

        let classifier = Classifier::new(CategoryRules::default());
        assert_eq!(classifier.classify_file(&path), "Images");
    }

    #[test]
    fn test_classify_folder_uses_dominant_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path().join("album");
        fs::create_dir_all(folder.join("disc2")).unwrap();
        fs::write(folder.join("01.mp3"), "a").unwrap();
        fs::write(folder.join("02.mp3"), "a").unwrap();
        fs::write(folder.join("disc2").join("03.mp3"), "a").unwrap();
        fs::write(folder.join("cover.jpg"), "a").unwrap();

        let classifier = Classifier::new(CategoryRules::default());
        assert_eq!(classifier.classify_folder(&folder).as_deref(), Some("Audio"));
    }

    #[test]
    fn test_classify_empty_folder_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path().join("empty");
        fs::create_dir_all(folder.join("nested")).unwrap();

        let classifier = Classifier::new(CategoryRules::default());
        assert_eq!(classifier.classify_folder(&folder), None);
    }

    #[test]
    fn test_classify_folder_respects_sample_limit() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path().join("mixed");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("only.txt"), "a").unwrap();

        let classifier = Classifier::with_sample_limit(CategoryRules::default(), 1);
        assert_eq!(
            classifier.classify_folder(&folder).as_deref(),
            Some("Documents")
        );
    }
}
