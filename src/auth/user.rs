//! User accounts and roles
//!
//! A user's role decides which lending operations access control will
//! let through: plain users issue and return their own loans,
//! administrators also manage the catalog and the admin lending paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::sync::{Arc, RwLock};

use crate::storage::{ChangeRecord, EntityKind, Journal};

use super::crypto::{hash_password, validate_password, verify_password};
use super::errors::{AuthError, AuthResult};

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Login name (unique)
    pub username: String,

    /// Role gating which operations this user may invoke
    pub role: Role,

    /// Argon2id password hash (never plaintext)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new account with the given username, password, and role
    pub fn new(username: &str, password: &str, role: Role) -> AuthResult<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidUsername);
        }

        validate_password(password)?;
        let password_hash = hash_password(password)?;

        Ok(Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            role,
            password_hash,
            created_at: Utc::now(),
        })
    }

    /// Verify a password against this account's stored hash
    pub fn verify_password(&self, password: &str) -> AuthResult<bool> {
        verify_password(password, &self.password_hash)
    }
}

/// Account creation request.
///
/// Carries no role field: self-service signups are always plain users.
/// Administrators exist only through bootstrap configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User repository trait
pub trait UserRepository: Send + Sync {
    /// Find a user by their ID
    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Find a user by their username
    fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Check if a username is already registered
    fn username_exists(&self, username: &str) -> AuthResult<bool>;

    /// Create a new user
    fn create(&self, user: &User) -> AuthResult<()>;
}

/// In-memory user repository, optionally journaled
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
    journal: Option<Arc<Journal>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository whose mutations are appended to `journal`
    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            journal: Some(journal),
        }
    }

    /// Insert or replace an account during journal replay (no re-journaling)
    pub fn restore(&self, user: User) -> AuthResult<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;
        if let Some(existing) = users.iter_mut().find(|u| u.id == user.id) {
            *existing = user;
        } else {
            users.push(user);
        }
        Ok(())
    }

    fn journal_put(&self, user: &User) -> AuthResult<()> {
        if let Some(journal) = &self.journal {
            // Accounts round-trip through the journal with their hash;
            // the skip_serializing on password_hash is for API
            // responses, so journaling uses an explicit record shape
            let record = JournaledUser::from(user);
            let payload =
                serde_json::to_vec(&record).map_err(|e| AuthError::Storage(e.to_string()))?;
            journal
                .append(&ChangeRecord::put(
                    EntityKind::User,
                    user.id.to_string(),
                    payload,
                ))
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

/// On-disk account shape, password hash included
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JournaledUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for JournaledUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            password_hash: user.password_hash.clone(),
            created_at: user.created_at,
        }
    }
}

impl From<JournaledUser> for User {
    fn from(record: JournaledUser) -> Self {
        Self {
            id: record.id,
            username: record.username,
            role: record.role,
            password_hash: record.password_hash,
            created_at: record.created_at,
        }
    }
}

impl UserRepository for InMemoryUserRepository {
    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    fn username_exists(&self, username: &str) -> AuthResult<bool> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;
        Ok(users.iter().any(|u| u.username == username))
    }

    fn create(&self, user: &User) -> AuthResult<()> {
        {
            let mut users = self
                .users
                .write()
                .map_err(|_| AuthError::Storage("Lock poisoned".to_string()))?;

            if users.iter().any(|u| u.username == user.username) {
                return Err(AuthError::UsernameTaken);
            }
            users.push(user.clone());
        }
        self.journal_put(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("alice", "password123", Role::User).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::User);
        assert!(!user.password_hash.is_empty());
        assert_ne!(user.password_hash, "password123");
    }

    #[test]
    fn test_empty_username_rejected() {
        let result = User::new("   ", "password123", Role::User);
        assert!(matches!(result, Err(AuthError::InvalidUsername)));
    }

    #[test]
    fn test_weak_password_rejected() {
        let result = User::new("alice", "short", Role::User);
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_password_verification() {
        let user = User::new("alice", "password123", Role::User).unwrap();

        assert!(user.verify_password("password123").unwrap());
        assert!(!user.verify_password("wrong_password").unwrap());
    }

    #[test]
    fn test_role_check() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn test_in_memory_repository() {
        let repo = InMemoryUserRepository::new();

        let user = User::new("alice", "password123", Role::User).unwrap();
        repo.create(&user).unwrap();

        assert!(repo.username_exists("alice").unwrap());
        assert!(!repo.username_exists("bob").unwrap());

        let found = repo.find_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, user.id);

        let duplicate = User::new("alice", "password456", Role::User).unwrap();
        assert!(matches!(
            repo.create(&duplicate),
            Err(AuthError::UsernameTaken)
        ));
    }

    #[test]
    fn test_serialization_omits_password_hash() {
        let user = User::new("alice", "password123", Role::User).unwrap();
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("password_hash"));
        assert!(!json.contains(&user.password_hash));
    }

    #[test]
    fn test_journaled_accounts_replay_with_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.journal");

        let user_id;
        {
            let journal = Arc::new(Journal::open(&path).unwrap());
            let repo = InMemoryUserRepository::with_journal(journal);
            let user = User::new("alice", "password123", Role::Admin).unwrap();
            user_id = user.id;
            repo.create(&user).unwrap();
        }

        let records = Journal::replay(&path).unwrap();
        assert_eq!(records.len(), 1);

        let repo = InMemoryUserRepository::new();
        for record in records {
            let journaled: JournaledUser = serde_json::from_slice(&record.payload).unwrap();
            repo.restore(User::from(journaled)).unwrap();
        }

        let restored = repo.find_by_id(user_id).unwrap().unwrap();
        assert_eq!(restored.role, Role::Admin);
        assert!(restored.verify_password("password123").unwrap());
    }
}
