// mssqlrestore/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::sqlcmd::Credentials;
use crate::restore::model::{RestoreRequest, RestoreSettings};
use crate::utils::sql::validate_database_name;

pub const DEFAULT_SERVER_INSTANCE: &str = "localhost";
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

// Struct for deserializing config.json. Every field is optional; CLI flags
// override whatever is set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub server_instance: Option<String>,
    pub backup_dir: Option<String>,
    pub database_name: Option<String>,
    pub sqlcmd_path: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub query_timeout_secs: Option<u64>,
    pub max_reap_iterations: Option<usize>,
    pub data_file_extension: Option<String>,
    pub log_file_extension: Option<String>,
    pub backup_file_extension: Option<String>,
}

impl RawJsonConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })
    }

    /// Loads `config_path` if it exists. A missing file is only an error when
    /// the path was given explicitly.
    pub fn load_optional(config_path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !config_path.exists() {
            return Ok(RawJsonConfig::default());
        }
        Self::load_from_json(config_path)
    }
}

/// Values taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backup: String,
    pub server_instance: Option<String>,
    pub backup_dir: Option<String>,
    pub database_name: Option<String>,
    pub dry_run: bool,
}

/// Process environment the configuration depends on.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Login name of the operator running the tool.
    pub operator: Option<String>,
    pub sqlcmd_password: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Environment {
            operator: std::env::var("USERNAME")
                .or_else(|_| std::env::var("USER"))
                .ok()
                .filter(|v| !v.trim().is_empty()),
            sqlcmd_password: std::env::var("SQLCMDPASSWORD").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub server_instance: String,
    pub sqlcmd_path: Option<PathBuf>,
    pub credentials: Credentials,
    pub query_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub request: RestoreRequest,
    pub settings: RestoreSettings,
}

/// Derives a database name from an operator login: the domain prefix is
/// dropped and anything other than letters, digits, `_` and `-` becomes `_`.
pub fn operator_database_name(login: &str) -> String {
    let account = login.rsplit('\\').next().unwrap_or(login);
    account
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

fn extension(value: Option<&String>, default: &str) -> String {
    non_empty(value)
        .map(|v| v.trim_start_matches('.').to_string())
        .unwrap_or_else(|| default.to_string())
}

pub fn resolve_app_config(
    raw: &RawJsonConfig,
    cli: &CliOverrides,
    env: &Environment,
) -> Result<AppConfig> {
    let backup = cli.backup.trim();
    if backup.is_empty() {
        anyhow::bail!("A backup file name is required.");
    }

    let server_instance = non_empty(cli.server_instance.as_ref())
        .or_else(|| non_empty(raw.server_instance.as_ref()))
        .unwrap_or_else(|| DEFAULT_SERVER_INSTANCE.to_string());

    let database_name = match non_empty(cli.database_name.as_ref())
        .or_else(|| non_empty(raw.database_name.as_ref()))
    {
        Some(name) => name,
        None => env
            .operator
            .as_deref()
            .map(operator_database_name)
            .filter(|name| !name.is_empty())
            .context("database_name is not set and the operator login could not be determined. Pass --database-name.")?,
    };
    validate_database_name(&database_name)?;

    let credentials = match non_empty(raw.username.as_ref()) {
        Some(username) => Credentials::SqlLogin {
            username,
            password: raw.password.clone().or_else(|| env.sqlcmd_password.clone()),
        },
        None => Credentials::Integrated,
    };

    let query_timeout_secs = raw.query_timeout_secs.unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);
    if query_timeout_secs == 0 {
        anyhow::bail!("query_timeout_secs must be greater than zero in config.json.");
    }
    let defaults = RestoreSettings::default();
    let max_reap_iterations = raw
        .max_reap_iterations
        .unwrap_or(defaults.max_reap_iterations);
    if max_reap_iterations == 0 {
        anyhow::bail!("max_reap_iterations must be greater than zero in config.json.");
    }

    Ok(AppConfig {
        connection: ConnectionConfig {
            server_instance: server_instance.clone(),
            sqlcmd_path: raw.sqlcmd_path.clone(),
            credentials,
            query_timeout: Duration::from_secs(query_timeout_secs),
        },
        request: RestoreRequest {
            database_name,
            backup_file: backup.to_string(),
            server_instance,
            backup_dir: non_empty(cli.backup_dir.as_ref())
                .or_else(|| non_empty(raw.backup_dir.as_ref())),
            dry_run: cli.dry_run,
        },
        settings: RestoreSettings {
            data_file_extension: extension(
                raw.data_file_extension.as_ref(),
                &defaults.data_file_extension,
            ),
            log_file_extension: extension(
                raw.log_file_extension.as_ref(),
                &defaults.log_file_extension,
            ),
            backup_file_extension: extension(
                raw.backup_file_extension.as_ref(),
                &defaults.backup_file_extension,
            ),
            max_reap_iterations,
        },
    })
}
