use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read input file '{path}': {source}")]
    InputFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database unreachable after {attempts} attempts ({waited_secs}s): {message}")]
    Connection {
        attempts: u32,
        waited_secs: u64,
        message: String,
    },

    #[error("Integrity violation during load: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl EtlError {
    /// Process exit code for this failure category, so a container supervisor
    /// can tell a config mistake from a dead database.
    pub fn exit_code(&self) -> i32 {
        match self {
            EtlError::Config(_) => 2,
            EtlError::InputFile { .. } | EtlError::Csv(_) | EtlError::Io(_) => 3,
            EtlError::Connection { .. } => 4,
            EtlError::Integrity(_) | EtlError::Database(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
