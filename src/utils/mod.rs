pub mod setting;
pub mod sql;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use which::which;

/// Finds the sqlcmd executable, preferring an explicitly configured path.
pub fn find_sqlcmd_executable(configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) => which(path).with_context(|| {
            format!(
                "sqlcmd_path '{}' from config.json is not an executable.",
                path.display()
            )
        }),
        None => which("sqlcmd").context(
            "sqlcmd executable not found in PATH. Please ensure the SQL Server command-line tools are installed and in your PATH.",
        ),
    }
}
