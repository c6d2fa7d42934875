//! Lending HTTP routes
//!
//! The user paths act on the authenticated principal's own identity:
//! the user id comes out of the verified token, never the request. The
//! admin paths require the admin role and act on the book alone.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::catalog::Book;
use crate::ledger::{LoanStatus, Transaction};

use super::auth_routes::AuthState;
use super::extract::principal_from;
use super::response::{reject, ApiError, MessageResponse};
use super::LibraryLendingEngine;

/// Shared lending state
pub struct LendingState {
    pub engine: LibraryLendingEngine,
    pub auth: Arc<AuthState>,
}

impl LendingState {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        principal_from(&self.auth.service, headers)
            .map_err(|e| reject(e.status_code(), e.to_string()))
    }
}

/// Lending routes with shared state
pub fn lending_routes(state: Arc<LendingState>) -> Router {
    Router::new()
        .route("/user/issue/:book_id", post(user_issue_handler))
        .route("/user/return/:book_id", post(user_return_handler))
        .route("/user/transactions", get(user_transactions_handler))
        .route("/admin/issue/:book_id", post(admin_issue_handler))
        .route("/admin/return/:book_id", post(admin_return_handler))
        .with_state(state)
}

// ==================
// Response Types
// ==================

/// Ledger entry with its book populated
#[derive(Debug, Serialize)]
pub struct TransactionWithBook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: LoanStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    /// None when the book has since left the catalog
    pub book: Option<Book>,
}

impl TransactionWithBook {
    fn new(transaction: Transaction, book: Option<Book>) -> Self {
        Self {
            id: transaction.id,
            user_id: transaction.user_id,
            status: transaction.status,
            due_date: transaction.due_date,
            created_at: transaction.created_at,
            returned_at: transaction.returned_at,
            book,
        }
    }
}

// ==================
// Handlers
// ==================

/// Issue a book to the calling user
async fn user_issue_handler(
    State(state): State<Arc<LendingState>>,
    headers: HeaderMap,
    Path(book_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let principal = state.authenticate(&headers)?;

    state
        .engine
        .issue(principal.user_id, book_id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok(Json(MessageResponse::new("Book issued successfully")))
}

/// Return a book borrowed by the calling user
async fn user_return_handler(
    State(state): State<Arc<LendingState>>,
    headers: HeaderMap,
    Path(book_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let principal = state.authenticate(&headers)?;

    state
        .engine
        .return_book(principal.user_id, book_id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok(Json(MessageResponse::new("Book returned successfully")))
}

/// The calling user's loan history, books populated
async fn user_transactions_handler(
    State(state): State<Arc<LendingState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<TransactionWithBook>>, ApiError> {
    let principal = state.authenticate(&headers)?;

    let history = state
        .engine
        .user_history(principal.user_id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok(Json(
        history
            .into_iter()
            .map(|(transaction, book)| TransactionWithBook::new(transaction, book))
            .collect(),
    ))
}

/// Admin: mark a book issued without a ledger entry
async fn admin_issue_handler(
    State(state): State<Arc<LendingState>>,
    headers: HeaderMap,
    Path(book_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let principal = state.authenticate(&headers)?;
    principal
        .require_admin()
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    state
        .engine
        .issue_unrecorded(book_id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok(Json(MessageResponse::new("Book issued successfully")))
}

/// Admin: return a book regardless of borrower
async fn admin_return_handler(
    State(state): State<Arc<LendingState>>,
    headers: HeaderMap,
    Path(book_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let principal = state.authenticate(&headers)?;
    principal
        .require_admin()
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    state
        .engine
        .return_any(book_id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok(Json(MessageResponse::new("Book returned successfully")))
}
