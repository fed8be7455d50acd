//! Title extraction for series grouping.
//!
//! Turns release-style names such as `Show.Name.S01E02.1080p.x264-RARBG.mkv`
//! into a normalized title (`Show Name`) so that episodes of the same show
//! end up with the same key.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Release, source, codec and scene tokens that never belong to a title.
pub const BLACKLIST: &[&str] = &[
    "480p", "576p", "720p", "1080p", "2160p", "4k", "uhd", "hdr", "10bit", "x264", "x265",
    "h264", "h265", "hevc", "avc", "xvid", "divx", "aac", "ac3", "dts", "ddp5", "bluray",
    "brrip", "bdrip", "webrip", "webdl", "web", "dl", "hdtv", "dvdrip", "remux", "proper",
    "repack", "internal", "multi", "subbed", "dubbed", "yify", "yts", "rarbg", "ettv", "eztv",
];

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*?\]|\([^)]*?\)|\{[^}]*?\}").expect("valid regex"));
static UNTERMINATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[({].*$").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[./\\_\-]+").expect("valid regex"));
static SEASON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bseason\s*\d{1,2}\b").expect("valid regex"));
static EPISODE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(s\d{1,2}e\d{1,2}|s\d{1,2}|e\d{1,2})$").expect("valid regex")
});

/// Extracts a normalized title from a file name.
///
/// The extension is dropped first. Returns an empty string when nothing of
/// the name survives; callers treat that as "no title".
pub fn extract_title(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize(&stem)
}

/// Title for a filesystem entry. Folders keep their whole name since dots in
/// folder names are separators, not extensions.
pub fn title_for_path(path: &Path, is_dir: bool) -> String {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return String::new();
    };
    if is_dir {
        normalize(&name)
    } else {
        extract_title(&name)
    }
}

fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let without_groups = BRACKETED.replace_all(&lowered, " ");
    let without_tail = UNTERMINATED.replace(&without_groups, "");
    let spaced = SEPARATORS.replace_all(&without_tail, " ");
    let without_season = SEASON_WORD.replace_all(&spaced, " ");

    let kept: Vec<&str> = without_season
        .split_whitespace()
        .filter(|token| !is_noise(token))
        .collect();

    let joined = kept.join(" ");
    let trimmed = joined.trim_matches(|c: char| c.is_whitespace() || "._-/\\".contains(c));
    title_case(trimmed)
}

fn is_noise(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
        || is_year(token)
        || EPISODE_MARKER.is_match(token)
        || BLACKLIST.contains(&token)
}

fn is_year(token: &str) -> bool {
    token.len() == 4
        && token
            .parse::<u16>()
            .is_ok_and(|year| (1900..=2099).contains(&year))
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blacklisted_scene_group_is_stripped() {
        assert_eq!(
            extract_title("Show.Name.S01E02.1080p.x264-RARBG.mkv"),
            "Show Name"
        );
    }

    #[test]
    fn test_unknown_scene_group_is_kept() {
        assert_eq!(
            extract_title("Show.Name.S01E02.1080p.x264-GROUP.mkv"),
            "Show Name Group"
        );
    }

    #[test]
    fn test_brackets_and_unterminated_groups_removed() {
        assert_eq!(
            extract_title("[SubsPlease] Frieren (2023) - 05 {Dual Audio} [1080p.mkv"),
            "Frieren"
        );
    }

    #[test]
    fn test_season_word_and_markers_removed() {
        assert_eq!(extract_title("the_office_season 2_e05.avi"), "The Office");
        assert_eq!(extract_title("Dark S02 E03.mp4"), "Dark");
    }

    #[test]
    fn test_year_and_numbers_removed() {
        assert_eq!(extract_title("Blade.Runner.1982.Remux.mkv"), "Blade Runner");
        assert_eq!(extract_title("Track 01.mp3"), "Track");
    }

    #[test]
    fn test_nothing_left_is_empty() {
        assert_eq!(extract_title("2021.mp4"), "");
        assert_eq!(extract_title("[x264].mkv"), "");
        assert_eq!(extract_title("S01E01.1080p.mkv"), "");
    }

    #[test]
    fn test_folder_names_keep_dotted_parts() {
        assert_eq!(
            title_for_path(Path::new("/tmp/Show.Name.S01.WEB-DL"), true),
            "Show Name"
        );
        assert_eq!(
            title_for_path(Path::new("/tmp/Show.Name.S01E03.mkv"), false),
            "Show Name"
        );
    }
}
