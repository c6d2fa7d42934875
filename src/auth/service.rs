//! Auth service and principals
//!
//! Combines the user store, session manager, and JWT manager into the
//! single surface the HTTP layer talks to. Validating an access token
//! yields a `Principal`, the verified identity every downstream
//! operation acts as. User ids are read from the principal, never from
//! request input, so a caller cannot act on someone else's behalf.

use std::sync::Arc;

use uuid::Uuid;

use super::errors::{AuthError, AuthResult};
use super::jwt::{JwtConfig, JwtManager, TokenResponse};
use super::session::{SessionConfig, SessionManager, SessionRepository};
use super::user::{LoginRequest, Role, SignupRequest, User, UserRepository};

/// Verified identity derived from a caller's credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    /// Pass when the principal holds the admin role, Forbidden otherwise
    pub fn require_admin(&self) -> AuthResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Auth service combining all auth components
pub struct AuthService<U: UserRepository, S: SessionRepository> {
    user_repo: Arc<U>,
    session_manager: SessionManager<S>,
    jwt_manager: JwtManager,
}

impl<U: UserRepository, S: SessionRepository> AuthService<U, S> {
    pub fn new(
        user_repo: Arc<U>,
        session_repo: S,
        jwt_config: JwtConfig,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            user_repo,
            session_manager: SessionManager::new(session_config, session_repo),
            jwt_manager: JwtManager::new(jwt_config),
        }
    }

    /// Register a new plain-user account.
    ///
    /// Signup never grants admin; administrators come from bootstrap
    /// configuration via `create_user`.
    pub fn signup(&self, request: SignupRequest) -> AuthResult<(User, TokenResponse)> {
        if self.user_repo.username_exists(&request.username)? {
            return Err(AuthError::UsernameTaken);
        }

        let user = User::new(&request.username, &request.password, Role::User)?;
        self.user_repo.create(&user)?;

        let tokens = self.issue_tokens(&user)?;
        Ok((user, tokens))
    }

    /// Create an account with an explicit role (bootstrap path)
    pub fn create_user(&self, username: &str, password: &str, role: Role) -> AuthResult<User> {
        if self.user_repo.username_exists(username)? {
            return Err(AuthError::UsernameTaken);
        }

        let user = User::new(username, password, role)?;
        self.user_repo.create(&user)?;
        Ok(user)
    }

    /// Authenticate a user by username and password
    pub fn login(&self, request: LoginRequest) -> AuthResult<(User, TokenResponse)> {
        let user = self
            .user_repo
            .find_by_username(&request.username)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.verify_password(&request.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_tokens(&user)?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a fresh token pair
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let (session, new_refresh_token) = self.session_manager.refresh_session(refresh_token)?;

        let user = self
            .user_repo
            .find_by_id(session.user_id)?
            .ok_or(AuthError::InvalidCredentials)?;

        let access_token = self.jwt_manager.generate_access_token(&user)?;
        Ok(TokenResponse::new(
            access_token,
            new_refresh_token,
            self.jwt_manager.get_expiration(),
        ))
    }

    /// Logout (invalidate the session behind a refresh token)
    pub fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        let session = self.session_manager.validate_refresh_token(refresh_token)?;
        self.session_manager.revoke_session(session.id)
    }

    /// Validate an access token and return the verified principal
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Principal> {
        let claims = self.jwt_manager.validate_token(token)?;
        let user_id = JwtManager::get_user_id(&claims)?;
        Ok(Principal {
            user_id,
            role: claims.role,
        })
    }

    fn issue_tokens(&self, user: &User) -> AuthResult<TokenResponse> {
        let (_, refresh_token) = self.session_manager.create_session(user.id)?;
        let access_token = self.jwt_manager.generate_access_token(user)?;
        Ok(TokenResponse::new(
            access_token,
            refresh_token,
            self.jwt_manager.get_expiration(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::InMemorySessionRepository;
    use crate::auth::user::InMemoryUserRepository;

    fn create_test_service() -> AuthService<InMemoryUserRepository, InMemorySessionRepository> {
        AuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            InMemorySessionRepository::new(),
            JwtConfig::with_secret("test_secret_key_for_testing_only"),
            SessionConfig::default(),
        )
    }

    fn signup_request() -> SignupRequest {
        SignupRequest {
            username: "alice".to_string(),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn test_signup() {
        let service = create_test_service();

        let (user, tokens) = service.signup(signup_request()).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::User);
        assert!(!tokens.access_token.is_empty());
        assert!(!tokens.refresh_token.is_empty());
    }

    #[test]
    fn test_signup_never_grants_admin() {
        let service = create_test_service();
        let (user, _) = service.signup(signup_request()).unwrap();
        assert!(!user.role.is_admin());
    }

    #[test]
    fn test_signup_duplicate_username() {
        let service = create_test_service();

        service.signup(signup_request()).unwrap();
        let result = service.signup(signup_request());

        assert!(matches!(result, Err(AuthError::UsernameTaken)));
    }

    #[test]
    fn test_login() {
        let service = create_test_service();
        service.signup(signup_request()).unwrap();

        let (user, tokens) = service
            .login(LoginRequest {
                username: "alice".to_string(),
                password: "password123".to_string(),
            })
            .unwrap();

        assert_eq!(user.username, "alice");
        assert!(!tokens.access_token.is_empty());
    }

    #[test]
    fn test_login_wrong_password() {
        let service = create_test_service();
        service.signup(signup_request()).unwrap();

        let result = service.login(LoginRequest {
            username: "alice".to_string(),
            password: "wrong_password".to_string(),
        });

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_login_unknown_user() {
        let service = create_test_service();

        let result = service.login(LoginRequest {
            username: "nobody".to_string(),
            password: "password123".to_string(),
        });

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_refresh_token_flow() {
        let service = create_test_service();
        let (_, tokens) = service.signup(signup_request()).unwrap();

        let new_tokens = service.refresh(&tokens.refresh_token).unwrap();

        assert!(!new_tokens.access_token.is_empty());
        assert_ne!(new_tokens.refresh_token, tokens.refresh_token);
    }

    #[test]
    fn test_logout_revokes_session() {
        let service = create_test_service();
        let (_, tokens) = service.signup(signup_request()).unwrap();

        service.logout(&tokens.refresh_token).unwrap();

        let result = service.refresh(&tokens.refresh_token);
        assert!(matches!(result, Err(AuthError::SessionRevoked)));
    }

    #[test]
    fn test_access_token_yields_principal() {
        let service = create_test_service();
        let (user, tokens) = service.signup(signup_request()).unwrap();

        let principal = service.validate_access_token(&tokens.access_token).unwrap();

        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.role, Role::User);
    }

    #[test]
    fn test_bootstrap_admin_principal() {
        let service = create_test_service();
        let admin = service
            .create_user("librarian", "password123", Role::Admin)
            .unwrap();

        let (_, tokens) = service
            .login(LoginRequest {
                username: "librarian".to_string(),
                password: "password123".to_string(),
            })
            .unwrap();

        let principal = service.validate_access_token(&tokens.access_token).unwrap();
        assert_eq!(principal.user_id, admin.id);
        assert!(principal.require_admin().is_ok());
    }

    #[test]
    fn test_plain_user_fails_admin_gate() {
        let service = create_test_service();
        let (_, tokens) = service.signup(signup_request()).unwrap();

        let principal = service.validate_access_token(&tokens.access_token).unwrap();
        assert!(matches!(
            principal.require_admin(),
            Err(AuthError::Forbidden)
        ));
    }
}
