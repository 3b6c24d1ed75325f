// mssqlrestore/src/restore/destination.rs
use tracing::debug;

use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};
use crate::utils::sql::{join_server_path, quote_literal};

/// Where the restored data and log files will be written.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationFileMapping {
    pub data_file_path: String,
    pub log_file_path: String,
    /// True when both paths were taken from an existing database.
    pub reuses_existing_files: bool,
}

pub(crate) fn existing_files_sql(database_name: &str) -> String {
    format!(
        "SELECT type_desc AS TypeDesc, physical_name AS PhysicalName \
FROM sys.master_files WHERE database_id = DB_ID({}) ORDER BY file_id;",
        quote_literal(database_name)
    )
}

/// Default file names for a database that does not exist yet.
pub fn synthesize_mapping(
    directory: &str,
    database_name: &str,
    data_extension: &str,
    log_extension: &str,
) -> DestinationFileMapping {
    DestinationFileMapping {
        data_file_path: join_server_path(
            directory,
            &format!("{}.{}", database_name, data_extension),
        ),
        log_file_path: join_server_path(
            directory,
            &format!("{}_log.{}", database_name, log_extension),
        ),
        reuses_existing_files: false,
    }
}

/// Extensions used when synthesizing destination file names.
#[derive(Debug, Clone, Copy)]
pub struct FileExtensions<'a> {
    pub data: &'a str,
    pub log: &'a str,
}

/// Resolves the destination paths for `database_name`.
///
/// An existing database keeps its current files. Otherwise the files are
/// named after the database inside `data_directory`, or inside
/// `fallback_directory` when the server has no default data path.
pub async fn resolve_destination<C: EngineClient>(
    client: &C,
    database_name: &str,
    data_directory: Option<&str>,
    fallback_directory: &str,
    extensions: FileExtensions<'_>,
) -> Result<DestinationFileMapping> {
    let files = client
        .query(Some("master"), &existing_files_sql(database_name))
        .await
        .map_err(|e| {
            RestoreError::RestoreRejected(format!(
                "Failed to read file catalog for '{}': {}",
                database_name, e
            ))
        })?;

    let mut existing_data = None;
    let mut existing_log = None;
    for row in 0..files.rows.len() {
        match (files.get(row, "TypeDesc"), files.get(row, "PhysicalName")) {
            (Some("ROWS"), Some(path)) if existing_data.is_none() => {
                existing_data = Some(path.to_string())
            }
            (Some("LOG"), Some(path)) if existing_log.is_none() => {
                existing_log = Some(path.to_string())
            }
            _ => {}
        }
    }

    let directory = data_directory.unwrap_or(fallback_directory);
    let synthesized = synthesize_mapping(directory, database_name, extensions.data, extensions.log);

    let mapping = match existing_data {
        Some(data_file_path) => {
            let reuses_log = existing_log.is_some();
            DestinationFileMapping {
                data_file_path,
                log_file_path: existing_log.unwrap_or(synthesized.log_file_path),
                reuses_existing_files: reuses_log,
            }
        }
        None => synthesized,
    };
    debug!(database = database_name, ?mapping, "destination resolved");
    Ok(mapping)
}
