use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// A required identifier or field was missing or unusable. Nothing was written.
    InvalidInput(String),
    NotFound(String),
    Sqlite(rusqlite::Error),
    InvalidData(String),
    /// The record exists but its lifecycle forbids the requested change.
    InvalidTransition(String),
    Config(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            StoreError::NotFound(what) => write!(f, "not found: {what}"),
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::InvalidTransition(msg) => write!(f, "invalid transition: {msg}"),
            StoreError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
