// mssqlrestore/src/restore/discovery.rs
use std::path::Path;

use tracing::warn;
use walkdir::WalkDir;

/// Lists backup files directly inside `directory` whose name ends in
/// `.{extension}` (case-insensitive), newest-looking names first.
///
/// Never fails: an unreadable directory yields an empty list.
pub fn discover_backups(directory: &Path, extension: &str) -> Vec<String> {
    let suffix = format!(".{}", extension.trim_start_matches('.')).to_ascii_lowercase();

    let mut names: Vec<String> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(directory = %directory.display(), "skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.to_ascii_lowercase().ends_with(&suffix))
        .collect();

    names.sort_unstable_by(|a, b| b.cmp(a));
    names
}
