//! Access Control
//!
//! Verifies caller identity and role, and owns the account plumbing
//! behind it: Argon2id password hashes, HS256 access tokens, and
//! single-use refresh-token sessions. A caller's identity is always
//! the one inside the verified token, never a client-supplied field.

mod crypto;
mod errors;
mod jwt;
mod service;
mod session;
mod user;

pub use crypto::{generate_token, hash_password, hash_token, validate_password, verify_password};
pub use errors::{AuthError, AuthResult};
pub use jwt::{JwtClaims, JwtConfig, JwtManager, TokenResponse};
pub use service::{AuthService, Principal};
pub(crate) use user::JournaledUser;
pub use session::{InMemorySessionRepository, Session, SessionConfig, SessionManager, SessionRepository};
pub use user::{InMemoryUserRepository, LoginRequest, Role, SignupRequest, User, UserRepository};
