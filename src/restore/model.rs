// mssqlrestore/src/restore/model.rs
use chrono::{DateTime, Local, TimeDelta};

use super::destination::DestinationFileMapping;
use super::server::ServerDirectories;
use super::verification::ServerTelemetry;

/// One restore invocation. Built once from CLI and config, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRequest {
    pub database_name: String,
    /// File name inside the backup directory, or a rooted server path.
    pub backup_file: String,
    pub server_instance: String,
    /// Explicit backup directory; wins over the server's configured one.
    pub backup_dir: Option<String>,
    pub dry_run: bool,
}

/// Tunables the orchestrator takes from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreSettings {
    pub data_file_extension: String,
    pub log_file_extension: String,
    pub backup_file_extension: String,
    pub max_reap_iterations: usize,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        RestoreSettings {
            data_file_extension: "mdf".to_string(),
            log_file_extension: "ldf".to_string(),
            backup_file_extension: "bak".to_string(),
            max_reap_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    Verified(ServerTelemetry),
    /// The server accepted the restore but the database could not be read back.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreReport {
    pub database_name: String,
    pub backup_path: String,
    pub mapping: DestinationFileMapping,
    pub sessions_terminated: usize,
    pub telemetry: Telemetry,
    pub started_at: DateTime<Local>,
    pub elapsed: TimeDelta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreFailure {
    /// Error class, e.g. `InvalidBackupError`.
    pub kind: &'static str,
    pub reason: String,
    pub backup_directory: String,
    /// Candidate backups, sorted by name descending.
    pub available_backups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DryRunReport {
    pub database_name: String,
    pub backup_path: String,
    pub backup_directory: String,
    pub directories: ServerDirectories,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    DryRun(DryRunReport),
    Success(RestoreReport),
    Failure(RestoreFailure),
}
