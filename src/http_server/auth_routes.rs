//! Auth HTTP routes
//!
//! Signup, login, refresh, and logout endpoints on top of AuthService.

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{LoginRequest, Role, SignupRequest, User};

use super::response::{reject, ApiError};
use super::LibraryAuthService;

/// Shared auth state
pub struct AuthState {
    pub service: LibraryAuthService,
}

/// Auth routes with shared state
pub fn auth_routes(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_handler))
        .route("/logout", post(logout_handler))
        .with_state(state)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

// ==================
// Handlers
// ==================

/// Signup handler (self-service accounts are always plain users)
async fn signup_handler(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (user, tokens) = state
        .service
        .signup(request)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    let response = AuthResponse {
        user: UserResponse::from(&user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login handler
async fn login_handler(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, tokens) = state
        .service
        .login(request)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    let response = AuthResponse {
        user: UserResponse::from(&user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    };
    Ok(Json(response))
}

/// Refresh token handler
async fn refresh_handler(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let tokens = state
        .service
        .refresh(&request.refresh_token)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok(Json(RefreshResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    }))
}

/// Logout handler
async fn logout_handler(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<LogoutRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .logout(&request.refresh_token)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
