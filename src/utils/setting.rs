// Connectivity smoke test run before the restore flow
use tracing::debug;

use crate::engine::EngineClient;

pub const PING_SQL: &str = "SELECT 1 AS Ping;";

pub async fn check_server_connection<C: EngineClient>(client: &C) -> bool {
    match client.query(Some("master"), PING_SQL).await {
        Ok(table) => {
            debug!(rows = table.rows.len(), "ping answered");
            println!("✅ Successfully connected to {}", client.server_instance());
            true
        }
        Err(e) => {
            eprintln!("❌ Failed to connect to {}: {}", client.server_instance(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeServer;

    #[tokio::test]
    async fn test_check_server_connection() {
        assert!(check_server_connection(&FakeServer::new()).await);
        assert!(!check_server_connection(&FakeServer::new().unreachable()).await);
    }
}
