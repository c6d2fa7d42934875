//! JWT token management
//!
//! JSON Web Token generation and validation.
//!
//! ## Invariants
//! - SEC3: Stateless validation (no store lookup)
//! - SEC4: Tokens carry identity and role only, no secrets

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};
use super::user::{Role, User};

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Login name
    pub username: String,

    /// Caller role
    pub role: Role,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing (256-bit minimum recommended)
    pub secret: String,

    /// Access token lifetime
    pub access_token_ttl: Duration,

    /// Issuer identifier
    pub issuer: String,

    /// Audience identifier
    pub audience: String,
}

impl JwtConfig {
    /// Config with the given secret and default lifetimes
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string(),
            access_token_ttl: Duration::minutes(15),
            issuer: "biblion".to_string(),
            audience: "biblion".to_string(),
        }
    }
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a new JWT manager with the given configuration
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generate an access token for a user (SEC4)
    pub fn generate_access_token(&self, user: &User) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now + self.config.access_token_ttl;

        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenGenerationFailed)
    }

    /// Validate an access token and extract claims (SEC3)
    pub fn validate_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AuthError::InvalidSignature
                    }
                    _ => AuthError::MalformedToken,
                }
            })?;

        Ok(token_data.claims)
    }

    /// Extract user ID from validated claims
    pub fn get_user_id(claims: &JwtClaims) -> AuthResult<Uuid> {
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedToken)
    }

    /// Get the expiration time for a new token
    pub fn get_expiration(&self) -> chrono::DateTime<Utc> {
        Utc::now() + self.config.access_token_ttl
    }
}

/// Token response returned to client
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: i64,
    pub refresh_token: String,
}

impl TokenResponse {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_at: chrono::DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        let expires_in = (expires_at - now).num_seconds();

        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
            expires_at: expires_at.timestamp(),
            refresh_token,
        }
    }
}
