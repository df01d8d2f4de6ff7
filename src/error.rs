//! Store error types.

use thiserror::Error;

/// Errors that can occur while operating a line store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row index {index} out of range (rows: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown journal command: {0:?}")]
    InvalidCommand(char),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
