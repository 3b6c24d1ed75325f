// mssqlrestore/src/engine/sqlcmd.rs
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::{EngineClient, Table};
use crate::errors::EngineError;

const COLUMN_SEPARATOR: char = '|';
const NULL_MARKER: &str = "NULL";

/// How `sqlcmd` authenticates against the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// Windows integrated security (`-E`).
    Integrated,
    /// SQL login (`-U`); the password is handed over through `SQLCMDPASSWORD`
    /// so it never shows up in the process list.
    SqlLogin {
        username: String,
        password: Option<String>,
    },
}

/// [`EngineClient`] backed by the `sqlcmd` command-line tool.
#[derive(Debug, Clone)]
pub struct SqlcmdClient {
    executable: PathBuf,
    server_instance: String,
    credentials: Credentials,
    query_timeout: Duration,
}

impl SqlcmdClient {
    pub fn new(
        executable: PathBuf,
        server_instance: String,
        credentials: Credentials,
        query_timeout: Duration,
    ) -> Self {
        SqlcmdClient {
            executable,
            server_instance,
            credentials,
            query_timeout,
        }
    }

    fn command(&self, database: Option<&str>, sql: &str) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-S")
            .arg(&self.server_instance)
            .arg("-b") // non-zero exit status on SQL errors
            .arg("-r1") // all server messages to stderr
            .arg("-I") // QUOTED_IDENTIFIER ON
            .arg("-x") // no $(var) substitution in paths or names
            .arg("-W") // strip padding
            .arg("-w")
            .arg("65535")
            .arg("-s")
            .arg(COLUMN_SEPARATOR.to_string());

        match &self.credentials {
            Credentials::Integrated => {
                cmd.arg("-E");
            }
            Credentials::SqlLogin { username, password } => {
                cmd.arg("-U").arg(username);
                if let Some(password) = password {
                    cmd.env("SQLCMDPASSWORD", password);
                }
            }
        }

        if let Some(database) = database {
            cmd.arg("-d").arg(database);
        }

        cmd.arg("-Q")
            .arg(format!("SET NOCOUNT ON; {}", sql))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    async fn run(
        &self,
        database: Option<&str>,
        sql: &str,
        limit: Option<Duration>,
    ) -> Result<String, EngineError> {
        debug!(
            server = %self.server_instance,
            database = database.unwrap_or("<default>"),
            "sqlcmd: {}",
            sql
        );

        let mut cmd = self.command(database, sql);
        let pending = cmd.output();
        let output = match limit {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| EngineError::Timeout(limit.as_secs()))??,
            None => pending.await?,
        };

        if !output.status.success() {
            return Err(EngineError::Command {
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl EngineClient for SqlcmdClient {
    fn server_instance(&self) -> &str {
        &self.server_instance
    }

    async fn query(&self, database: Option<&str>, sql: &str) -> Result<Table, EngineError> {
        let stdout = self.run(database, sql, Some(self.query_timeout)).await?;
        parse_result_set(&stdout)
    }

    async fn execute(&self, database: Option<&str>, sql: &str) -> Result<(), EngineError> {
        self.run(database, sql, None).await.map(|_| ())
    }
}

/// Parses the first result set printed by `sqlcmd -W -s '|'`: a header line,
/// a dashed underline, then one line per row up to the first blank line.
pub(crate) fn parse_result_set(stdout: &str) -> Result<Table, EngineError> {
    let mut lines = stdout
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .skip_while(|l| l.trim().is_empty());

    let Some(header) = lines.next() else {
        return Ok(Table::default());
    };
    let columns: Vec<String> = header
        .split(COLUMN_SEPARATOR)
        .map(|c| c.trim().to_string())
        .collect();

    match lines.next() {
        Some(underline) if is_underline(underline) => {}
        _ => {
            return Err(EngineError::Malformed(format!(
                "expected header underline after '{}'",
                header
            )));
        }
    }

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        let cells: Vec<Option<String>> = line
            .splitn(columns.len(), COLUMN_SEPARATOR)
            .map(|cell| {
                if cell == NULL_MARKER {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        if cells.len() != columns.len() {
            return Err(EngineError::Malformed(format!(
                "row has {} cells, expected {}: '{}'",
                cells.len(),
                columns.len(),
                line
            )));
        }
        rows.push(cells);
    }

    Ok(Table { columns, rows })
}

fn is_underline(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '-' || c == COLUMN_SEPARATOR)
}
