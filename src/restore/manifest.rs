// mssqlrestore/src/restore/manifest.rs
use tracing::{debug, warn};

use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};
use crate::utils::sql::quote_literal;

#[derive(Debug, Clone, PartialEq)]
pub enum FileType {
    Data,
    Log,
    /// Filestream, full-text catalogs and anything else; ignored by restore.
    Other(String),
}

impl FileType {
    fn from_code(code: &str) -> Self {
        match code.trim() {
            "D" => FileType::Data,
            "L" => FileType::Log,
            other => FileType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub logical_name: String,
    pub physical_name: String,
    pub file_type: FileType,
}

/// The file list a backup declares, as reported by `RESTORE FILELISTONLY`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupFileManifest {
    pub entries: Vec<ManifestEntry>,
}

impl BackupFileManifest {
    pub fn data(&self) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.file_type == FileType::Data)
    }

    pub fn log(&self) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.file_type == FileType::Log)
    }
}

pub(crate) fn file_list_sql(backup_path: &str) -> String {
    format!("RESTORE FILELISTONLY FROM DISK = {};", quote_literal(backup_path))
}

/// Reads the backup's file manifest without restoring it. The manifest must
/// contain a data file.
pub async fn read_manifest<C: EngineClient>(
    client: &C,
    backup_path: &str,
) -> Result<BackupFileManifest> {
    let invalid = |reason: String| RestoreError::InvalidBackup {
        path: backup_path.to_string(),
        reason,
    };

    let table = client
        .query(Some("master"), &file_list_sql(backup_path))
        .await
        .map_err(|e| invalid(e.to_string()))?;

    let mut entries = Vec::with_capacity(table.rows.len());
    for row in 0..table.rows.len() {
        let field = |column: &str| -> Result<String> {
            table
                .require(row, column)
                .map_err(|e| invalid(e.to_string()))?
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("{} is NULL in file list", column)))
        };
        entries.push(ManifestEntry {
            logical_name: field("LogicalName")?,
            physical_name: field("PhysicalName")?,
            file_type: FileType::from_code(&field("Type")?),
        });
    }
    let manifest = BackupFileManifest { entries };

    if manifest.data().is_none() {
        return Err(invalid("backup contains no data file".to_string()));
    }
    let extra_data = manifest
        .entries
        .iter()
        .filter(|e| e.file_type == FileType::Data)
        .count()
        - 1;
    if extra_data > 0 {
        warn!(
            backup = backup_path,
            extra_data, "backup has additional data files; they keep their original paths"
        );
    }
    for entry in &manifest.entries {
        if let FileType::Other(code) = &entry.file_type {
            debug!(logical = %entry.logical_name, code = %code, "ignoring backup file of unsupported type");
        }
    }
    debug!(?manifest, "backup manifest read");
    Ok(manifest)
}
