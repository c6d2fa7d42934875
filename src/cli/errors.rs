//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit.

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file missing, unreadable, or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure outside the journal
    #[error("I/O error: {0}")]
    Io(String),

    /// `init` refused to clobber an existing configuration
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// The service failed to boot
    #[error("Boot failed: {0}")]
    Boot(String),
}

impl CliError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::Boot(msg.into())
    }
}
