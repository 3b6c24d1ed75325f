// mssqlrestore/src/restore/db_restore.rs
use tracing::debug;

use super::destination::DestinationFileMapping;
use super::manifest::BackupFileManifest;
use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};
use crate::utils::sql::{quote_ident, quote_literal};

/// Renders the `RESTORE DATABASE` statement that replaces `database_name`
/// with the backup, moving its data (and log, when the backup has one) onto
/// the destination paths.
pub fn build_restore_command(
    database_name: &str,
    backup_path: &str,
    manifest: &BackupFileManifest,
    mapping: &DestinationFileMapping,
) -> Result<String> {
    let data = manifest.data().ok_or_else(|| RestoreError::InvalidBackup {
        path: backup_path.to_string(),
        reason: "backup contains no data file".to_string(),
    })?;

    let mut command = format!(
        "RESTORE DATABASE {} FROM DISK = {} WITH REPLACE, RECOVERY, MOVE {} TO {}",
        quote_ident(database_name),
        quote_literal(backup_path),
        quote_literal(&data.logical_name),
        quote_literal(&mapping.data_file_path),
    );
    if let Some(log) = manifest.log() {
        command.push_str(&format!(
            ", MOVE {} TO {}",
            quote_literal(&log.logical_name),
            quote_literal(&mapping.log_file_path)
        ));
    }
    command.push(';');
    Ok(command)
}

/// Issues the restore against `master`. The server is given as long as it
/// needs; a refusal becomes `RestoreRejected`.
pub async fn restore_database<C: EngineClient>(client: &C, command: &str) -> Result<()> {
    debug!("issuing restore: {}", command);
    client
        .execute(Some("master"), command)
        .await
        .map_err(|e| RestoreError::RestoreRejected(e.to_string()))
}
