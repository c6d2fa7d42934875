//! Catalog HTTP routes
//!
//! Book listing is public; creating and removing books is admin-only.
//! A book with an open loan cannot be removed (409): the ledger must
//! never reference a book that no longer exists while the loan is open.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::catalog::{Book, BookRepository, CatalogError, InMemoryBookRepository, NewBook};
use crate::ledger::{InMemoryTransactionRepository, TransactionRepository};

use super::auth_routes::AuthState;
use super::extract::principal_from;
use super::response::{reject, ApiError};

/// Shared catalog state
pub struct CatalogState {
    pub books: Arc<InMemoryBookRepository>,
    pub ledger: Arc<InMemoryTransactionRepository>,
    pub auth: Arc<AuthState>,
}

/// Catalog routes with shared state, nested under /books
pub fn catalog_routes(state: Arc<CatalogState>) -> Router {
    Router::new()
        .route("/", get(list_books_handler).post(create_book_handler))
        .route("/:id", get(get_book_handler).delete(delete_book_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

/// List all books (public)
async fn list_books_handler(
    State(state): State<Arc<CatalogState>>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state
        .books
        .list()
        .map_err(|e| reject(e.status_code(), e.to_string()))?;
    Ok(Json(books))
}

/// Get one book (public)
async fn get_book_handler(
    State(state): State<Arc<CatalogState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .books
        .find_by_id(id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?
        .ok_or_else(|| {
            let e = CatalogError::NotFound;
            reject(e.status_code(), e.to_string())
        })?;
    Ok(Json(book))
}

/// Create a book (admin only)
async fn create_book_handler(
    State(state): State<Arc<CatalogState>>,
    headers: HeaderMap,
    Json(request): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let principal = principal_from(&state.auth.service, &headers)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;
    principal
        .require_admin()
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    let book = Book::new(&request.name, &request.author, request.availability)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;
    state
        .books
        .create(&book)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Remove a book (admin only)
async fn delete_book_handler(
    State(state): State<Arc<CatalogState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    let principal = principal_from(&state.auth.service, &headers)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;
    principal
        .require_admin()
        .map_err(|e| reject(e.status_code(), e.to_string()))?;

    // A book with an open loan stays in the catalog
    let open_loan = state
        .ledger
        .find_open_loan_for_book(id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?;
    if open_loan.is_some() {
        let e = CatalogError::OnLoan;
        return Err(reject(e.status_code(), e.to_string()));
    }

    let removed = state
        .books
        .remove(id)
        .map_err(|e| reject(e.status_code(), e.to_string()))?
        .ok_or_else(|| {
            let e = CatalogError::NotFound;
            reject(e.status_code(), e.to_string())
        })?;

    Ok(Json(removed))
}
