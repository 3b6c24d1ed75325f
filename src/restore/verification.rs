// mssqlrestore/src/restore/verification.rs
use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};

pub(crate) const TELEMETRY_SQL: &str = "SELECT \
CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128)) AS ProductVersion, \
CAST(SUM(CAST(size AS bigint)) * 8 / 1024.0 AS decimal(18, 2)) AS SizeMB, \
@@SERVICENAME AS ServiceName, \
(SELECT COUNT(*) FROM sys.dm_exec_connections) AS ConnectionsUsed, \
@@MAX_CONNECTIONS AS ConnectionsMax \
FROM sys.database_files;";

/// Version, size and connection figures read back from the restored database.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTelemetry {
    pub product_version: String,
    pub size_mb: f64,
    pub service_name: String,
    pub connections_used: u64,
    pub connections_max: u64,
}

/// Queries the freshly restored database. Any failure here means the
/// database could not be read back, not that the restore itself failed.
pub async fn verify_restore<C: EngineClient>(
    client: &C,
    database_name: &str,
) -> Result<ServerTelemetry> {
    let table = client
        .query(Some(database_name), TELEMETRY_SQL)
        .await
        .map_err(|e| RestoreError::Verification(e.to_string()))?;

    if table.is_empty() {
        return Err(RestoreError::Verification(format!(
            "'{}' returned no telemetry row",
            database_name
        )));
    }

    let text = |column: &str| -> Result<String> {
        table
            .require(0, column)
            .map_err(|e| RestoreError::Verification(e.to_string()))?
            .map(|v| v.trim().to_string())
            .ok_or_else(|| RestoreError::Verification(format!("{} is NULL", column)))
    };
    let number = |column: &str| -> Result<f64> {
        let raw = text(column)?;
        raw.parse::<f64>().map_err(|_| {
            RestoreError::Verification(format!("{} is not numeric: '{}'", column, raw))
        })
    };

    Ok(ServerTelemetry {
        product_version: text("ProductVersion")?,
        size_mb: number("SizeMB")?,
        service_name: text("ServiceName")?,
        connections_used: number("ConnectionsUsed")? as u64,
        connections_max: number("ConnectionsMax")? as u64,
    })
}
