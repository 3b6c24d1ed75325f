// mssqlrestore/src/restore/logic.rs
use std::path::Path;

use chrono::Local;
use tracing::{info, warn};

use super::db_restore::{build_restore_command, restore_database};
use super::destination::{DestinationFileMapping, FileExtensions, resolve_destination};
use super::discovery::discover_backups;
use super::manifest::read_manifest;
use super::model::{
    DryRunReport, RestoreFailure, RestoreOutcome, RestoreReport, RestoreRequest, RestoreSettings,
    Telemetry,
};
use super::server::{ServerDirectories, inspect_server};
use super::sessions::reap_sessions;
use super::verification::verify_restore;
use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};
use crate::utils::sql::{is_rooted_server_path, join_server_path, server_parent_dir};

/// Runs one restore end to end.
///
/// Returns `Err` only for connectivity problems hit before the restore is
/// attempted (server inspection, session reaping). A backup that cannot be
/// read or a restore the server refuses is reported as
/// [`RestoreOutcome::Failure`] with the backups found in the directory.
pub async fn perform_restore_orchestration<C: EngineClient>(
    client: &C,
    request: &RestoreRequest,
    settings: &RestoreSettings,
) -> Result<RestoreOutcome> {
    let directories = inspect_server(client).await?;
    let backup_directory = request
        .backup_dir
        .clone()
        .or_else(|| directories.backup_directory.clone())
        .ok_or_else(|| {
            RestoreError::Connectivity(format!(
                "Server '{}' has no default backup directory and none was given",
                client.server_instance()
            ))
        })?;
    let backup_path = if is_rooted_server_path(&request.backup_file) {
        request.backup_file.clone()
    } else {
        join_server_path(&backup_directory, &request.backup_file)
    };
    println!(
        "Backup: {} → database [{}] on {}",
        backup_path,
        request.database_name,
        request.server_instance
    );

    if request.dry_run {
        info!(database = %request.database_name, "dry run: no sessions terminated, no restore issued");
        return Ok(RestoreOutcome::DryRun(DryRunReport {
            database_name: request.database_name.clone(),
            backup_path,
            backup_directory,
            directories,
        }));
    }

    let sessions_terminated =
        reap_sessions(client, &request.database_name, settings.max_reap_iterations).await?;
    println!(
        "✓ Terminated sessions on '{}' ({} connected at start).",
        request.database_name, sessions_terminated
    );

    let started_at = Local::now();
    let mapping = match attempt_restore(client, request, settings, &directories, &backup_path).await
    {
        Ok(mapping) => mapping,
        Err(err) => {
            warn!(kind = err.kind(), "restore attempt failed: {}", err);
            let discovery_dir = if is_rooted_server_path(&request.backup_file) {
                server_parent_dir(&request.backup_file)
                    .unwrap_or(&backup_directory)
                    .to_string()
            } else {
                backup_directory
            };
            let available_backups =
                discover_backups(Path::new(&discovery_dir), &settings.backup_file_extension);
            return Ok(RestoreOutcome::Failure(RestoreFailure {
                kind: err.kind(),
                reason: err.to_string(),
                backup_directory: discovery_dir,
                available_backups,
            }));
        }
    };

    let telemetry = match verify_restore(client, &request.database_name).await {
        Ok(telemetry) => Telemetry::Verified(telemetry),
        Err(err) => {
            warn!("restore completed but verification failed: {}", err);
            Telemetry::Unavailable {
                reason: err.to_string(),
            }
        }
    };

    Ok(RestoreOutcome::Success(RestoreReport {
        database_name: request.database_name.clone(),
        backup_path,
        mapping,
        sessions_terminated,
        telemetry,
        started_at,
        elapsed: Local::now() - started_at,
    }))
}

/// Manifest, destination and the restore itself; any error here is
/// recoverable by the caller.
async fn attempt_restore<C: EngineClient>(
    client: &C,
    request: &RestoreRequest,
    settings: &RestoreSettings,
    directories: &ServerDirectories,
    backup_path: &str,
) -> Result<DestinationFileMapping> {
    let manifest = read_manifest(client, backup_path).await?;

    // without a server default, new files go into the directory the backup was read from
    let fallback_directory = server_parent_dir(backup_path).unwrap_or_default();

    let mapping = resolve_destination(
        client,
        &request.database_name,
        directories.data_directory.as_deref(),
        fallback_directory,
        FileExtensions {
            data: &settings.data_file_extension,
            log: &settings.log_file_extension,
        },
    )
    .await?;
    println!(
        "Restoring data → {}, log → {}{}",
        mapping.data_file_path,
        mapping.log_file_path,
        if mapping.reuses_existing_files {
            " (existing files)"
        } else {
            ""
        }
    );

    let command = build_restore_command(&request.database_name, backup_path, &manifest, &mapping)?;
    println!("🔄 Restoring database '{}'...", request.database_name);
    restore_database(client, &command).await?;
    Ok(mapping)
}
