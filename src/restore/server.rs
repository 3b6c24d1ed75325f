// mssqlrestore/src/restore/server.rs
use tracing::debug;

use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};

/// Reads the default data path from the server properties and the backup
/// directory from the instance registry hive.
pub(crate) const SERVER_DIRECTORIES_SQL: &str = "DECLARE @BackupDirectory nvarchar(4000); \
EXEC master.dbo.xp_instance_regread N'HKEY_LOCAL_MACHINE', \
N'Software\\Microsoft\\MSSQLServer\\MSSQLServer', N'BackupDirectory', @BackupDirectory OUTPUT; \
SELECT CAST(SERVERPROPERTY('InstanceDefaultDataPath') AS nvarchar(4000)) AS DataDirectory, \
@BackupDirectory AS BackupDirectory;";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerDirectories {
    pub data_directory: Option<String>,
    pub backup_directory: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the instance's default data and backup directories.
pub async fn inspect_server<C: EngineClient>(client: &C) -> Result<ServerDirectories> {
    let table = client
        .query(Some("master"), SERVER_DIRECTORIES_SQL)
        .await
        .map_err(|e| RestoreError::connectivity("Failed to read server directories", e))?;

    if table.is_empty() {
        return Err(RestoreError::Connectivity(format!(
            "Server '{}' returned no configuration row",
            client.server_instance()
        )));
    }

    let read = |column: &str| {
        table
            .require(0, column)
            .map(non_blank)
            .map_err(|e| RestoreError::connectivity("Unreadable server configuration", e))
    };
    let directories = ServerDirectories {
        data_directory: read("DataDirectory")?,
        backup_directory: read("BackupDirectory")?,
    };
    debug!(?directories, "server directories resolved");
    Ok(directories)
}
