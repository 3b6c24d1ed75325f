use thiserror::Error;

/// Failures raised by an [`EngineClient`](crate::engine::EngineClient).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to launch database client: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command execution failed with status: {status}\nStdout: {stdout}\nStderr: {stderr}")]
    Command {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Query timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unexpected result set: {0}")]
    Malformed(String),
}

/// Restore taxonomy. Only `Connectivity` is fatal to the process; the others
/// are caught by the orchestrator and turned into a reported outcome.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Invalid backup '{path}': {reason}")]
    InvalidBackup { path: String, reason: String },

    #[error("Restore rejected by server: {0}")]
    RestoreRejected(String),

    #[error("Verification failed: {0}")]
    Verification(String),
}

impl RestoreError {
    pub fn connectivity(context: &str, err: EngineError) -> Self {
        RestoreError::Connectivity(format!("{}: {}", context, err))
    }

    /// Short label used when reporting a caught failure to the operator.
    pub fn kind(&self) -> &'static str {
        match self {
            RestoreError::Connectivity(_) => "ConnectivityError",
            RestoreError::InvalidBackup { .. } => "InvalidBackupError",
            RestoreError::RestoreRejected(_) => "RestoreRejectedError",
            RestoreError::Verification(_) => "VerificationError",
        }
    }
}

pub type Result<T> = std::result::Result<T, RestoreError>;
