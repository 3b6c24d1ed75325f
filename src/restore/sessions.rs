// mssqlrestore/src/restore/sessions.rs
use tracing::{debug, warn};

use crate::engine::EngineClient;
use crate::errors::{RestoreError, Result};
use crate::utils::sql::quote_literal;

fn session_filter(database_name: &str) -> String {
    format!(
        "FROM sys.dm_exec_sessions WHERE database_id = DB_ID({}) \
         AND is_user_process = 1 AND session_id <> @@SPID",
        quote_literal(database_name)
    )
}

pub(crate) fn count_sessions_sql(database_name: &str) -> String {
    format!(
        "SELECT COUNT(*) AS SessionCount {};",
        session_filter(database_name)
    )
}

pub(crate) fn next_session_sql(database_name: &str) -> String {
    format!(
        "SELECT MIN(session_id) AS SessionId {};",
        session_filter(database_name)
    )
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>, column: &str) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RestoreError::Connectivity(format!("Unexpected {} value '{}'", column, raw))
        }),
    }
}

/// Terminates every session connected to `database_name`, one at a time,
/// re-querying after each `KILL` so sessions that appear mid-loop are caught.
///
/// Returns how many sessions were connected when reaping started. Stops after
/// `max_iterations` kills if sessions keep reappearing.
pub async fn reap_sessions<C: EngineClient>(
    client: &C,
    database_name: &str,
    max_iterations: usize,
) -> Result<usize> {
    let counted = client
        .query(Some("master"), &count_sessions_sql(database_name))
        .await
        .map_err(|e| RestoreError::connectivity("Failed to count sessions", e))?;
    let initial = counted
        .require(0, "SessionCount")
        .map_err(|e| RestoreError::connectivity("Failed to count sessions", e))?;
    let initial: usize = parse_number(initial, "SessionCount")?.unwrap_or(0);

    let mut killed = 0usize;
    loop {
        let next = client
            .query(Some("master"), &next_session_sql(database_name))
            .await
            .map_err(|e| RestoreError::connectivity("Failed to look up active sessions", e))?;
        let session_id = next
            .require(0, "SessionId")
            .map_err(|e| RestoreError::connectivity("Failed to look up active sessions", e))?;
        let Some(session_id) = parse_number::<u32>(session_id, "SessionId")? else {
            break;
        };

        if killed >= max_iterations {
            warn!(
                database = database_name,
                killed, "sessions keep reconnecting; giving up on reaping after cap"
            );
            println!(
                "⚠️ Sessions are still connecting to '{}' after {} terminations. Continuing with restore.",
                database_name, killed
            );
            break;
        }

        debug!(database = database_name, session_id, "terminating session");
        client
            .execute(Some("master"), &format!("KILL {};", session_id))
            .await
            .map_err(|e| {
                RestoreError::connectivity(&format!("Failed to terminate session {}", session_id), e)
            })?;
        killed += 1;
    }

    debug!(database = database_name, initial, killed, "session reaping finished");
    Ok(initial)
}
