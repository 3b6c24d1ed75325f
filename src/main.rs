//! SQL Server restore tool
//!
//! Restores a single backup file onto a target database, moving its files onto
//! the destination layout and clearing connected sessions first.

// mssqlrestore/src/main.rs
mod config;
mod engine;
mod errors;
mod restore;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliOverrides, Environment, RawJsonConfig, resolve_app_config};
use restore::model::RestoreOutcome;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Parser, Debug)]
#[command(name = "mssqlrestore", version, about = "Restore a SQL Server backup onto a target database")]
struct Cli {
    /// Backup file name inside the backup directory, or a full server path
    #[arg(value_name = "BACKUP", required_unless_present = "backup_flag")]
    backup: Option<String>,

    #[arg(long = "backup", value_name = "BACKUP", conflicts_with = "backup")]
    backup_flag: Option<String>,

    /// Server instance to restore on [default: localhost]
    #[arg(short = 'S', long)]
    server_instance: Option<String>,

    /// Directory holding the backup [default: the server's backup directory]
    #[arg(short = 'b', long)]
    backup_dir: Option<String>,

    /// Target database [default: derived from the operator login]
    #[arg(short = 'd', long)]
    database_name: Option<String>,

    /// Resolve directories and report what would happen, without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Path to config.json
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Enable debug logging (SQL statements issued)
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Main entry point for the restore tool
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_app(cli).await {
        Ok(RestoreOutcome::Failure(_)) => {
            println!("Restore did not complete. Pick one of the backups above and try again.");
            ExitCode::SUCCESS
        }
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_app(cli: Cli) -> Result<RestoreOutcome> {
    let (config_path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let raw_config = RawJsonConfig::load_optional(&config_path, explicit).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;

    let overrides = CliOverrides {
        backup: cli.backup.or(cli.backup_flag).unwrap_or_default(),
        server_instance: cli.server_instance,
        backup_dir: cli.backup_dir,
        database_name: cli.database_name,
        dry_run: cli.dry_run,
    };
    let app_config = resolve_app_config(&raw_config, &overrides, &Environment::from_process())
        .context("Invalid restore configuration")?;

    println!(
        "🔄 Starting Restore Process{}...",
        if app_config.request.dry_run { " (dry run)" } else { "" }
    );
    restore::run_restore_flow(&app_config).await
}
