//! Filesystem assertions for mirror folders

use std::path::Path;

/// Every regular file below `root`, as sorted `/`-separated relative paths
pub fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .expect("walked path is under root")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

/// Assert no `.tmp` partial download survived
pub fn assert_no_partials(root: &Path) {
    let partials: Vec<String> = files_under(root)
        .into_iter()
        .filter(|f| f.ends_with(chart_mirror::downloader::PARTIAL_SUFFIX))
        .collect();
    assert!(partials.is_empty(), "leftover partial files: {partials:?}");
}

/// Assert `path` contains `needle` and nothing matching `absent`
pub fn assert_file_mentions(path: &Path, needle: &str, absent: &str) {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    assert!(content.contains(needle), "{} lacks {needle:?}:\n{content}", path.display());
    assert!(!content.contains(absent), "{} still has {absent:?}:\n{content}", path.display());
}
