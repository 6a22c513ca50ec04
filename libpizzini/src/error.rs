//! Error types for Pizzini

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PizziniError>;

#[derive(Error, Debug)]
pub enum PizziniError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Entry error: {0}")]
    Entry(#[from] EntryError),

    #[error("Publishing failed: {0}")]
    Publish(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PizziniError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PizziniError::InvalidInput(_) => 3,
            PizziniError::Config(_) => 2,
            PizziniError::Entry(_) => 2,
            PizziniError::Schedule(_) => 1,
            PizziniError::Snapshot(_) => 1,
            PizziniError::Publish(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid time window {start}-{end}")]
    InvalidWindow { start: String, end: String },

    #[error("No time windows supplied")]
    NoTimeWindows,

    #[error("Entry list is empty")]
    EmptyEntries,

    #[error("Interval must be at least one day")]
    InvalidInterval,

    #[error("Posts per week must be at least one")]
    InvalidFrequency,

    #[error("No async runtime available to run the scheduler")]
    NoRuntime,
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("Failed to read entries file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse entries: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate entry id {0}")]
    DuplicateId(i64),
}
