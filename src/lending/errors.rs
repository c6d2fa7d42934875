//! Lending error types

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::ledger::LedgerError;

/// Result type for lending operations
pub type LendingResult<T> = Result<T, LendingError>;

/// Errors raised by the lending engine
#[derive(Debug, Clone, Error)]
pub enum LendingError {
    /// Book missing or already on loan
    #[error("Book not available for issue")]
    BookUnavailable,

    /// No Borrowed entry for this (user, book) pair
    #[error("You have not borrowed this book")]
    NoOpenLoan,

    /// Admin return of a book that does not exist
    #[error("Book not found")]
    BookNotFound,

    /// Durable-store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LendingError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LendingError::BookUnavailable => 400,
            LendingError::NoOpenLoan => 400,
            LendingError::BookNotFound => 400,
            LendingError::Storage(_) => 500,
        }
    }
}

impl From<CatalogError> for LendingError {
    fn from(err: CatalogError) -> Self {
        LendingError::Storage(err.to_string())
    }
}

impl From<LedgerError> for LendingError {
    fn from(err: LedgerError) -> Self {
        LendingError::Storage(err.to_string())
    }
}
