//! Session management
//!
//! Refresh-token sessions backing the short-lived access tokens.
//! Sessions live in memory only; a restart logs everyone out of their
//! refresh tokens, access tokens keep working until they expire.
//!
//! ## Invariants
//! - SES1: Refresh tokens are single-use
//! - SES2: Sessions expire at stated time
//! - SES3: Logout invalidates immediately

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::crypto::{constant_time_str_eq, generate_token, hash_token};
use super::errors::{AuthError, AuthResult};

/// Session model
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,

    /// User this session belongs to
    pub user_id: Uuid,

    /// Hashed refresh token (raw token given to client)
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session expires
    pub expires_at: DateTime<Utc>,

    /// Whether the session has been revoked
    pub revoked: bool,
}

/// Session manager configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_token_ttl: Duration::days(30),
        }
    }
}

/// Session manager handles session creation and validation
pub struct SessionManager<R: SessionRepository> {
    config: SessionConfig,
    repository: R,
}

impl<R: SessionRepository> SessionManager<R> {
    pub fn new(config: SessionConfig, repository: R) -> Self {
        Self { config, repository }
    }

    /// Create a new session for a user.
    ///
    /// Returns the raw refresh token (not hashed) to give to the client.
    pub fn create_session(&self, user_id: Uuid) -> AuthResult<(Session, String)> {
        let refresh_token = generate_token();
        let refresh_token_hash = hash_token(&refresh_token);

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash,
            created_at: now,
            expires_at: now + self.config.refresh_token_ttl,
            revoked: false,
        };

        self.repository.create(&session)?;

        Ok((session, refresh_token))
    }

    /// Rotate a session: revoke the old one, hand out a new token (SES1)
    pub fn refresh_session(&self, refresh_token: &str) -> AuthResult<(Session, String)> {
        let old_session = self.validate_refresh_token(refresh_token)?;

        self.repository.revoke(old_session.id)?;
        self.create_session(old_session.user_id)
    }

    /// Revoke a session (SES3)
    pub fn revoke_session(&self, session_id: Uuid) -> AuthResult<()> {
        self.repository.revoke(session_id)
    }

    /// Validate a refresh token and return the associated session
    pub fn validate_refresh_token(&self, refresh_token: &str) -> AuthResult<Session> {
        let token_hash = hash_token(refresh_token);

        let session = self
            .repository
            .find_by_refresh_token_hash(&token_hash)?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if session.revoked {
            return Err(AuthError::SessionRevoked);
        }

        if session.expires_at < Utc::now() {
            return Err(AuthError::InvalidRefreshToken);
        }

        Ok(session)
    }
}

/// Session repository trait
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    fn create(&self, session: &Session) -> AuthResult<()>;

    /// Find session by refresh token hash
    fn find_by_refresh_token_hash(&self, hash: &str) -> AuthResult<Option<Session>>;

    /// Revoke a session
    fn revoke(&self, id: Uuid) -> AuthResult<()>;
}

/// In-memory session repository
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: std::sync::RwLock<Vec<Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn create(&self, session: &Session) -> AuthResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;
        sessions.push(session.clone());
        Ok(())
    }

    fn find_by_refresh_token_hash(&self, hash: &str) -> AuthResult<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;
        Ok(sessions
            .iter()
            .find(|s| constant_time_str_eq(&s.refresh_token_hash, hash))
            .cloned())
    }

    fn revoke(&self, id: Uuid) -> AuthResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;

        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.revoked = true;
            Ok(())
        } else {
            Err(AuthError::InvalidRefreshToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_manager() -> SessionManager<InMemorySessionRepository> {
        SessionManager::new(SessionConfig::default(), InMemorySessionRepository::new())
    }

    #[test]
    fn test_session_creation() {
        let manager = create_manager();
        let user_id = Uuid::new_v4();

        let (session, refresh_token) = manager.create_session(user_id).unwrap();

        assert_eq!(session.user_id, user_id);
        assert!(!session.revoked);
        assert!(!refresh_token.is_empty());
        // The raw token is not what's stored
        assert_ne!(session.refresh_token_hash, refresh_token);
    }

    #[test]
    fn test_refresh_token_validation() {
        let manager = create_manager();
        let user_id = Uuid::new_v4();

        let (_, refresh_token) = manager.create_session(user_id).unwrap();

        let session = manager.validate_refresh_token(&refresh_token).unwrap();
        assert_eq!(session.user_id, user_id);

        let result = manager.validate_refresh_token("invalid_token");
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[test]
    fn test_session_refresh_single_use() {
        let manager = create_manager();
        let user_id = Uuid::new_v4();

        let (_, refresh_token) = manager.create_session(user_id).unwrap();

        let (new_session, new_token) = manager.refresh_session(&refresh_token).unwrap();
        assert_eq!(new_session.user_id, user_id);
        assert_ne!(new_token, refresh_token);

        // Using the old token again fails (SES1)
        let result = manager.refresh_session(&refresh_token);
        assert!(matches!(result, Err(AuthError::SessionRevoked)));

        // The new token works
        manager.refresh_session(&new_token).unwrap();
    }

    #[test]
    fn test_session_revocation() {
        let manager = create_manager();
        let user_id = Uuid::new_v4();

        let (session, refresh_token) = manager.create_session(user_id).unwrap();

        manager.revoke_session(session.id).unwrap();

        let result = manager.validate_refresh_token(&refresh_token);
        assert!(matches!(result, Err(AuthError::SessionRevoked)));
    }

    #[test]
    fn test_expired_session_rejected() {
        let manager = SessionManager::new(
            SessionConfig {
                refresh_token_ttl: Duration::seconds(-1),
            },
            InMemorySessionRepository::new(),
        );

        let (_, refresh_token) = manager.create_session(Uuid::new_v4()).unwrap();
        let result = manager.validate_refresh_token(&refresh_token);
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }
}
