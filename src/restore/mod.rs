mod logic;
pub(crate) mod db_restore;
pub(crate) mod destination;
pub(crate) mod discovery;
pub(crate) mod manifest;
pub(crate) mod model;
pub(crate) mod server;
pub(crate) mod sessions;
pub(crate) mod verification;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::engine::sqlcmd::SqlcmdClient;
use crate::utils::find_sqlcmd_executable;
use crate::utils::setting::check_server_connection;
use model::{RestoreOutcome, Telemetry};

/// Public entry point for the restore process.
///
/// Errors returned here are fatal (client missing, server unreachable,
/// session reaping failed). A failed restore attempt is a normal
/// [`RestoreOutcome::Failure`].
pub async fn run_restore_flow(app_config: &AppConfig) -> Result<RestoreOutcome> {
    let sqlcmd_path = find_sqlcmd_executable(app_config.connection.sqlcmd_path.as_deref())?;
    println!("Found sqlcmd executable at: {}", sqlcmd_path.display());

    let client = SqlcmdClient::new(
        sqlcmd_path,
        app_config.connection.server_instance.clone(),
        app_config.connection.credentials.clone(),
        app_config.connection.query_timeout,
    );
    if !check_server_connection(&client).await {
        anyhow::bail!(
            "Cannot proceed with restore: server '{}' is unreachable.",
            app_config.connection.server_instance
        );
    }

    let outcome =
        logic::perform_restore_orchestration(&client, &app_config.request, &app_config.settings)
            .await
            .context("Restore process failed")?;
    print_outcome(&outcome);
    Ok(outcome)
}

pub fn print_outcome(outcome: &RestoreOutcome) {
    match outcome {
        RestoreOutcome::DryRun(report) => {
            println!("🔎 Dry run: nothing was changed.");
            println!("   Database:         {}", report.database_name);
            println!("   Backup file:      {}", report.backup_path);
            println!("   Backup directory: {}", report.backup_directory);
            println!(
                "   Data directory:   {}",
                report
                    .directories
                    .data_directory
                    .as_deref()
                    .unwrap_or("<server default not set>")
            );
        }
        RestoreOutcome::Success(report) => {
            println!(
                "✅ Restored '{}' from {} in {:.1}s (started {}).",
                report.database_name,
                report.backup_path,
                report.elapsed.num_milliseconds() as f64 / 1000.0,
                report.started_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("   Sessions terminated: {}", report.sessions_terminated);
            println!("   Data file: {}", report.mapping.data_file_path);
            println!("   Log file:  {}", report.mapping.log_file_path);
            match &report.telemetry {
                Telemetry::Verified(t) => {
                    println!("   Version:     {}", t.product_version);
                    println!("   Size:        {:.2} MB", t.size_mb);
                    println!("   Service:     {}", t.service_name);
                    println!(
                        "   Connections: {} of {}",
                        t.connections_used, t.connections_max
                    );
                }
                Telemetry::Unavailable { reason } => {
                    println!("⚠️ Restore completed but the database could not be verified: {}", reason);
                }
            }
        }
        RestoreOutcome::Failure(failure) => {
            println!("❌ {}: {}", failure.kind, failure.reason);
            if failure.available_backups.is_empty() {
                println!("No backups found in {}.", failure.backup_directory);
            } else {
                println!("Available backups in {}:", failure.backup_directory);
                for name in &failure.available_backups {
                    println!("   {}", name);
                }
            }
        }
    }
}
