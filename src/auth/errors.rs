//! Auth error types
//!
//! Status mapping follows the API contract: a missing credential is
//! 401, a credential that fails verification (malformed, expired, bad
//! signature) is 403, and an insufficient role is 403.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // ==================
    // Authentication
    // ==================
    /// No credential on the request
    #[error("Authentication token is missing")]
    MissingToken,

    /// Login failed (generic - don't leak whether the username exists)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Username already registered
    #[error("Username already registered")]
    UsernameTaken,

    /// Username empty or malformed
    #[error("Username is required")]
    InvalidUsername,

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    // ==================
    // Tokens
    // ==================
    /// Token is not a valid JWT
    #[error("Invalid token")]
    MalformedToken,

    /// Token has expired
    #[error("Token expired")]
    TokenExpired,

    /// Token signature does not verify
    #[error("Invalid token signature")]
    InvalidSignature,

    // ==================
    // Sessions
    // ==================
    /// Refresh token unknown, expired, or already used
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Session has been revoked
    #[error("Session has been revoked")]
    SessionRevoked,

    // ==================
    // Authorization
    // ==================
    /// Caller's role does not permit the operation
    #[error("Admin access required")]
    Forbidden,

    // ==================
    // Internal
    // ==================
    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::WeakPassword(_) => 400,
            AuthError::InvalidUsername => 400,

            // 401 Unauthorized
            AuthError::MissingToken => 401,
            AuthError::InvalidCredentials => 401,
            AuthError::InvalidRefreshToken => 401,
            AuthError::SessionRevoked => 401,

            // 403 Forbidden
            AuthError::MalformedToken => 403,
            AuthError::TokenExpired => 403,
            AuthError::InvalidSignature => 403,
            AuthError::Forbidden => 403,

            // 409 Conflict
            AuthError::UsernameTaken => 409,

            // 500 Internal Server Error
            AuthError::HashingFailed => 500,
            AuthError::TokenGenerationFailed => 500,
            AuthError::Storage(_) => 500,
        }
    }

    /// Whether this error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AuthError::MissingToken.status_code(), 401);
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::TokenExpired.status_code(), 403);
        assert_eq!(AuthError::InvalidSignature.status_code(), 403);
        assert_eq!(AuthError::Forbidden.status_code(), 403);
        assert_eq!(AuthError::UsernameTaken.status_code(), 409);
        assert_eq!(AuthError::HashingFailed.status_code(), 500);
    }

    #[test]
    fn test_login_failure_does_not_leak_info() {
        let err = AuthError::InvalidCredentials;
        assert!(!err.to_string().contains("password"));
        assert!(!err.to_string().contains("username"));
    }
}
