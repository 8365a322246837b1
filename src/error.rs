//! Error types, one enum per concern.

use crate::store::DataKey;

/// Failures reading or writing a persisted document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON for {key}: {source}")]
    Json {
        key: DataKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Remote store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Remote store unreachable: {0}")]
    Transport(String),

    #[error("No data directory available")]
    NoDataDir,
}

/// Invalid session transitions.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("A workout is already in progress ({0})")]
    AlreadyActive(String),

    #[error("No workout in progress")]
    NoActiveSession,

    #[error("No exercise log for routine exercise {0}")]
    UnknownLog(String),

    #[error("Set {index} does not exist for routine exercise {log}")]
    UnknownSet { log: String, index: usize },

    #[error("Routine {0} not found")]
    UnknownRoutine(String),

    #[error("Workout day {sub_routine} not found in routine {routine}")]
    UnknownSubRoutine { routine: String, sub_routine: String },
}

/// Backup files that cannot be applied.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Could not read backup file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup file is not valid: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Import cancelled")]
    Cancelled,
}

/// Failures talking to the text-completion endpoint.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion response had no text")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled by user")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AppError>;
