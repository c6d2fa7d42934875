//! Journal error types
//!
//! Corruption in the middle of the journal is unrecoverable: replay
//! must stop the boot rather than serve from partial state. A torn
//! record at the tail is expected after a crash and is not an error.

use std::io;

use thiserror::Error;

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors raised by the change journal
#[derive(Debug, Error)]
pub enum JournalError {
    /// Disk I/O failure while appending or replaying
    #[error("journal I/O failure: {0}")]
    Io(#[from] io::Error),

    /// Checksum or framing failure before the journal tail
    #[error("journal corruption at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },
}

impl JournalError {
    /// Corruption error with byte offset context
    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether the journal must not be used after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, JournalError::Corruption { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_is_fatal() {
        let err = JournalError::corruption(1024, "checksum mismatch");
        assert!(err.is_fatal());
        let display = format!("{}", err);
        assert!(display.contains("1024"));
        assert!(display.contains("checksum mismatch"));
    }

    #[test]
    fn test_io_error_not_fatal() {
        let err = JournalError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(!err.is_fatal());
    }
}
