//! Bearer-token extraction
//!
//! Identity always comes from the verified credential: handlers take a
//! `Principal` from these helpers and never read a user id out of the
//! request path or body.

use axum::http::HeaderMap;

use crate::auth::{AuthError, AuthResult, Principal};

use super::LibraryAuthService;

/// Pull the bearer credential off a request.
///
/// Accepts both `Authorization: Bearer <token>` and a bare token value.
/// A missing header is 401; whether the token verifies is decided by
/// the auth service.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    Ok(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Authenticate a request: extract the token and validate it
pub fn principal_from(
    service: &LibraryAuthService,
    headers: &HeaderMap,
) -> AuthResult<Principal> {
    let token = bearer_token(headers)?;
    service.validate_access_token(token)
}
