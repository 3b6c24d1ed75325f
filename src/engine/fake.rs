// mssqlrestore/src/engine/fake.rs
//! In-memory stand-in for a SQL Server instance, answering the statements the
//! restore flow issues.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::{EngineClient, Table};
use crate::errors::EngineError;

#[derive(Debug, Clone)]
pub struct FakeFile {
    logical_name: String,
    physical_name: String,
    type_code: String,
}

impl FakeFile {
    pub fn data(logical: &str, physical: &str) -> Self {
        Self::other(logical, physical, "D")
    }

    pub fn log(logical: &str, physical: &str) -> Self {
        Self::other(logical, physical, "L")
    }

    pub fn other(logical: &str, physical: &str, type_code: &str) -> Self {
        FakeFile {
            logical_name: logical.to_string(),
            physical_name: physical.to_string(),
            type_code: type_code.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    data_directory: Option<String>,
    backup_directory: Option<String>,
    backups: HashMap<String, Vec<FakeFile>>,
    databases: HashMap<String, (String, Option<String>)>,
    sessions: HashMap<String, BTreeSet<u32>>,
    respawn_sessions: bool,
    next_session_id: u32,
    fail_kills: bool,
    fail_verification: bool,
    fail_catalog_reads: bool,
    reject_restores: Option<String>,
    unreachable: bool,
    killed: Vec<u32>,
    restores: Vec<Vec<(String, String)>>,
}

#[derive(Debug, Default)]
pub struct FakeServer {
    state: Mutex<State>,
}

/// A server-side error the way `sqlcmd -b -r1` surfaces it.
fn server_error(message: impl Into<String>) -> EngineError {
    EngineError::Command {
        status: "exit status: 1".to_string(),
        stdout: String::new(),
        stderr: message.into(),
    }
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Every `N'...'` literal in `sql`, unescaped.
fn literals(sql: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = sql;
    while let Some(start) = rest.find("N'") {
        let mut value = String::new();
        let mut chars = rest[start + 2..].char_indices().peekable();
        let mut consumed = rest.len() - start - 2;
        while let Some((idx, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    value.push('\'');
                    continue;
                }
                consumed = idx + 1;
                break;
            }
            value.push(c);
        }
        found.push(value);
        rest = &rest[start + 2 + consumed..];
    }
    found
}

fn restored_database_name(sql: &str) -> Option<String> {
    let start = sql.find('[')? + 1;
    let end = sql.find("] FROM DISK")?;
    Some(sql[start..end].replace("]]", "]"))
}

impl FakeServer {
    pub fn new() -> Self {
        FakeServer {
            state: Mutex::new(State {
                next_session_id: 1000,
                ..State::default()
            }),
        }
    }

    fn edit(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut *self.state.lock().unwrap());
        self
    }

    pub fn with_data_directory(self, dir: &str) -> Self {
        self.edit(|s| s.data_directory = Some(dir.to_string()))
    }

    pub fn with_backup_directory(self, dir: &str) -> Self {
        self.edit(|s| s.backup_directory = Some(dir.to_string()))
    }

    pub fn with_backup(self, path: &str, files: Vec<FakeFile>) -> Self {
        self.edit(|s| {
            s.backups.insert(path.to_string(), files);
        })
    }

    pub fn with_database(self, name: &str, data: &str, log: Option<&str>) -> Self {
        self.edit(|s| {
            s.databases
                .insert(name.to_string(), (data.to_string(), log.map(str::to_string)));
        })
    }

    pub fn with_sessions(self, database: &str, ids: &[u32]) -> Self {
        self.edit(|s| {
            s.sessions
                .entry(database.to_string())
                .or_default()
                .extend(ids.iter().copied());
        })
    }

    /// Every killed session is immediately replaced by a new one.
    pub fn with_respawning_sessions(self) -> Self {
        self.edit(|s| s.respawn_sessions = true)
    }

    pub fn failing_kills(self) -> Self {
        self.edit(|s| s.fail_kills = true)
    }

    pub fn failing_verification(self) -> Self {
        self.edit(|s| s.fail_verification = true)
    }

    pub fn failing_catalog_reads(self) -> Self {
        self.edit(|s| s.fail_catalog_reads = true)
    }

    pub fn rejecting_restores(self, message: &str) -> Self {
        self.edit(|s| s.reject_restores = Some(message.to_string()))
    }

    pub fn unreachable(self) -> Self {
        self.edit(|s| s.unreachable = true)
    }

    pub fn killed_sessions(&self) -> Vec<u32> {
        self.state.lock().unwrap().killed.clone()
    }

    pub fn session_count(&self, database: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(database)
            .map_or(0, BTreeSet::len)
    }

    /// `(logical name, target path)` pairs of every restore that was applied.
    pub fn restore_moves(&self) -> Vec<Vec<(String, String)>> {
        self.state.lock().unwrap().restores.clone()
    }

    pub fn database_files(&self, database: &str) -> Option<(String, Option<String>)> {
        self.state.lock().unwrap().databases.get(database).cloned()
    }

    fn handle(&self, database: Option<&str>, sql: &str) -> Result<Table, EngineError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(server_error("Login timeout expired"));
        }
        let args = literals(sql);

        if sql.contains("AS Ping") {
            return Ok(Table::new(&["Ping"], vec![vec![text("1")]]));
        }

        if sql.contains("xp_instance_regread") {
            return Ok(Table::new(
                &["DataDirectory", "BackupDirectory"],
                vec![vec![
                    state.data_directory.clone(),
                    state.backup_directory.clone(),
                ]],
            ));
        }

        if sql.contains("AS SessionCount") {
            let count = state.sessions.get(&args[0]).map_or(0, BTreeSet::len);
            return Ok(Table::new(
                &["SessionCount"],
                vec![vec![text(&count.to_string())]],
            ));
        }

        if sql.contains("MIN(session_id)") {
            let lowest = state
                .sessions
                .get(&args[0])
                .and_then(|ids| ids.iter().next().copied());
            return Ok(Table::new(
                &["SessionId"],
                vec![vec![lowest.map(|id| id.to_string())]],
            ));
        }

        if let Some(id) = sql.strip_prefix("KILL ") {
            if state.fail_kills {
                return Err(server_error(
                    "Only user processes can be killed.".to_string(),
                ));
            }
            let id: u32 = id
                .trim_end_matches(';')
                .trim()
                .parse()
                .map_err(|_| server_error(format!("bad KILL: {}", sql)))?;
            let respawn = state.respawn_sessions;
            let replacement = state.next_session_id;
            let mut killed = false;
            for ids in state.sessions.values_mut() {
                if ids.remove(&id) {
                    killed = true;
                    if respawn {
                        ids.insert(replacement);
                    }
                }
            }
            if !killed {
                return Err(server_error(format!(
                    "Process ID {} is not an active process ID.",
                    id
                )));
            }
            state.next_session_id += 1;
            state.killed.push(id);
            return Ok(Table::default());
        }

        if sql.starts_with("RESTORE FILELISTONLY") {
            let files = state.backups.get(&args[0]).ok_or_else(|| {
                server_error(format!(
                    "Msg 3201: Cannot open backup device '{}'. Operating system error 2.",
                    args[0]
                ))
            })?;
            let rows = files
                .iter()
                .map(|f| {
                    vec![
                        text(&f.logical_name),
                        text(&f.physical_name),
                        text(&f.type_code),
                    ]
                })
                .collect();
            return Ok(Table::new(&["LogicalName", "PhysicalName", "Type"], rows));
        }

        if sql.contains("sys.master_files") {
            if state.fail_catalog_reads {
                return Err(server_error(
                    "The SELECT permission was denied on the object 'master_files'",
                ));
            }
            let rows = match state.databases.get(&args[0]) {
                Some((data, log)) => {
                    let mut rows = vec![vec![text("ROWS"), text(data)]];
                    if let Some(log) = log {
                        rows.push(vec![text("LOG"), text(log)]);
                    }
                    rows
                }
                None => Vec::new(),
            };
            return Ok(Table::new(&["TypeDesc", "PhysicalName"], rows));
        }

        if sql.starts_with("RESTORE DATABASE") {
            if let Some(message) = &state.reject_restores {
                return Err(server_error(message.clone()));
            }
            let name = restored_database_name(sql)
                .ok_or_else(|| server_error(format!("bad RESTORE: {}", sql)))?;
            if !state.backups.contains_key(&args[0]) {
                return Err(server_error(format!(
                    "Cannot open backup device '{}'",
                    args[0]
                )));
            }
            let moves: Vec<(String, String)> = args[1..]
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            let data = moves[0].1.clone();
            let log = moves
                .get(1)
                .map(|m| m.1.clone())
                .or_else(|| state.databases.get(&name).and_then(|(_, log)| log.clone()));
            state.databases.insert(name.clone(), (data, log));
            state.sessions.remove(&name);
            state.restores.push(moves);
            return Ok(Table::default());
        }

        if sql.contains("SERVERPROPERTY('ProductVersion')") {
            if state.fail_verification {
                return Err(server_error(
                    "Database is in recovery pending state".to_string(),
                ));
            }
            let known = database.is_some_and(|db| state.databases.contains_key(db));
            if !known {
                return Err(server_error(format!(
                    "Cannot open database \"{}\" requested by the login.",
                    database.unwrap_or_default()
                )));
            }
            let connections: usize = state.sessions.values().map(BTreeSet::len).sum::<usize>() + 1;
            return Ok(Table::new(
                &[
                    "ProductVersion",
                    "SizeMB",
                    "ServiceName",
                    "ConnectionsUsed",
                    "ConnectionsMax",
                ],
                vec![vec![
                    text("15.0.4365.2"),
                    text("16.00"),
                    text("MSSQLSERVER"),
                    text(&connections.to_string()),
                    text("32767"),
                ]],
            ));
        }

        Err(EngineError::Malformed(format!("unrecognized statement: {}", sql)))
    }
}

impl EngineClient for FakeServer {
    fn server_instance(&self) -> &str {
        "fake"
    }

    async fn query(&self, database: Option<&str>, sql: &str) -> Result<Table, EngineError> {
        self.handle(database, sql)
    }

    async fn execute(&self, database: Option<&str>, sql: &str) -> Result<(), EngineError> {
        self.handle(database, sql).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_unescape_quotes() {
        assert_eq!(
            literals("RESTORE DATABASE [x] FROM DISK = N'it''s.bak' WITH MOVE N'a' TO N'b';"),
            vec!["it's.bak", "a", "b"]
        );
    }

    #[test]
    fn test_restored_database_name() {
        assert_eq!(
            restored_database_name("RESTORE DATABASE [a]]b] FROM DISK = N'x'").as_deref(),
            Some("a]b")
        );
    }
}
