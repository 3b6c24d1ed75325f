// mssqlrestore/src/engine/mod.rs
//! Access to the database server.
//!
//! Everything the restore flow needs from SQL Server goes through
//! [`EngineClient`], so the orchestration can run against the `sqlcmd`
//! client in production and against an in-memory server in tests.

pub(crate) mod sqlcmd;
#[cfg(test)]
pub(crate) mod fake;

use crate::errors::EngineError;

/// A single tabular result set. Cells that the server returned as NULL are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    #[cfg(test)]
    pub fn new(columns: &[&str], rows: Vec<Vec<Option<String>>>) -> Self {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Returns the cell at (`row`, `column`), or `None` when the row or column
    /// is missing or the value is NULL.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Like [`Table::get`] but fails when the column is absent from the result.
    pub fn require(&self, row: usize, column: &str) -> Result<Option<&str>, EngineError> {
        let idx = self.column_index(column).ok_or_else(|| {
            EngineError::Malformed(format!(
                "column '{}' missing from result (columns: {:?})",
                column, self.columns
            ))
        })?;
        Ok(self.rows.get(row).and_then(|r| r.get(idx)).and_then(|v| v.as_deref()))
    }
}

/// Executes queries and commands against one server instance.
///
/// `database` scopes the statement to a named database; `None` runs it in the
/// login's default database.
#[allow(async_fn_in_trait)]
pub trait EngineClient {
    /// Identifier of the server instance this client talks to.
    fn server_instance(&self) -> &str;

    /// Runs a query and returns its first result set.
    async fn query(&self, database: Option<&str>, sql: &str) -> Result<Table, EngineError>;

    /// Runs a command whose output is not needed. Commands are never bounded
    /// by a client-side timeout: once a restore is issued the server decides
    /// how long it takes.
    async fn execute(&self, database: Option<&str>, sql: &str) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let table = Table::new(
            &["LogicalName", "Type"],
            vec![vec![Some("Hub_Data".into()), Some("D".into())]],
        );
        assert_eq!(table.get(0, "logicalname"), Some("Hub_Data"));
        assert_eq!(table.get(0, "TYPE"), Some("D"));
        assert_eq!(table.get(1, "Type"), None);
        assert_eq!(table.get(0, "Missing"), None);
    }

    #[test]
    fn test_require_reports_missing_column() {
        let table = Table::new(&["SessionId"], vec![vec![None]]);
        assert_eq!(table.require(0, "SessionId").ok().flatten(), None);
        assert!(matches!(
            table.require(0, "session_id"),
            Err(EngineError::Malformed(_))
        ));
    }
}
