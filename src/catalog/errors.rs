//! Catalog error types

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised by the book registry
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Bad input on create (missing name or author)
    #[error("{0}")]
    Validation(String),

    /// Book does not exist
    #[error("Cannot find book")]
    NotFound,

    /// Book has an open loan and cannot be removed
    #[error("Book is currently on loan")]
    OnLoan,

    /// Durable-store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::Validation(_) => 400,
            CatalogError::NotFound => 404,
            CatalogError::OnLoan => 409,
            CatalogError::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(CatalogError::Validation("name".into()).status_code(), 400);
        assert_eq!(CatalogError::NotFound.status_code(), 404);
        assert_eq!(CatalogError::OnLoan.status_code(), 409);
        assert_eq!(CatalogError::Storage("io".into()).status_code(), 500);
    }
}
