//! Error types for puzzlebench-store

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be opened or written
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    /// Game id does not exist in the store
    #[error("Game not found: {0}")]
    GameNotFound(String),

    /// A game was finalized twice
    #[error("Game already finalized: {0}")]
    AlreadyFinalized(String),

    /// A rating snapshot already exists for this game
    #[error("Snapshot already recorded for game: {0}")]
    DuplicateSnapshot(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
