// mssqlrestore/src/utils/sql.rs
//! T-SQL quoting and server-side path helpers.
//!
//! Paths handled here live on the database server, which may run a different
//! OS than this tool, so `std::path` is deliberately not used.

use anyhow::Result;

const MAX_IDENTIFIER_LEN: usize = 128;

/// Renders a Unicode string literal: `N'...'` with embedded quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Renders a bracket-delimited identifier: `[...]` with `]` doubled.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

pub fn validate_database_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Database name cannot be empty.");
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        anyhow::bail!(
            "Database name '{}' exceeds {} characters.",
            name,
            MAX_IDENTIFIER_LEN
        );
    }
    if name.chars().any(|c| c.is_control()) {
        anyhow::bail!("Database name {:?} contains control characters.", name);
    }
    Ok(())
}

fn is_drive_prefixed(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn is_windows_style(path: &str) -> bool {
    path.contains('\\') || is_drive_prefixed(path)
}

/// True for `C:\...`, `\\share\...` and `/...`.
pub fn is_rooted_server_path(path: &str) -> bool {
    is_drive_prefixed(path) || path.starts_with('\\') || path.starts_with('/')
}

/// Joins a file name onto a server directory using the directory's own
/// separator style.
pub fn join_server_path(dir: &str, file_name: &str) -> String {
    let separator = if is_windows_style(dir) { '\\' } else { '/' };
    let trimmed = dir.trim_end_matches(['\\', '/']);
    format!("{}{}{}", trimmed, separator, file_name)
}

/// Directory part of a server path, without the trailing separator.
pub fn server_parent_dir(path: &str) -> Option<&str> {
    let idx = path.rfind(['\\', '/'])?;
    let parent = &path[..idx];
    if parent.is_empty() || parent.ends_with(':') {
        // keep the root separator for "/file" and "D:\file"
        Some(&path[..=idx])
    } else {
        Some(parent)
    }
}
