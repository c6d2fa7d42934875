//! Ledger error types

use thiserror::Error;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors raised by the transaction ledger
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// A (user, book) pair already has an open loan
    #[error("An open loan already exists for this user and book")]
    DuplicateLoan,

    /// Durable-store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // The engine's availability check makes this unreachable
            // through the API; surfacing it means the stores diverged.
            LedgerError::DuplicateLoan => 500,
            LedgerError::Storage(_) => 500,
        }
    }
}
