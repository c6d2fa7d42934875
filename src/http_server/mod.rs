//! HTTP server
//!
//! The API surface: catalog, lending, and auth endpoints, plus the
//! bearer-token extraction and status-code translation between engine
//! outcomes and HTTP responses.

mod auth_routes;
mod catalog_routes;
mod config;
mod extract;
mod lending_routes;
mod response;
mod server;

pub use auth_routes::{auth_routes, AuthState};
pub use catalog_routes::{catalog_routes, CatalogState};
pub use config::HttpServerConfig;
pub use extract::{bearer_token, principal_from};
pub use lending_routes::{lending_routes, LendingState};
pub use response::{ErrorBody, MessageResponse};
pub use server::{AppContext, HttpServer};

use crate::auth::{AuthService, InMemorySessionRepository, InMemoryUserRepository};
use crate::catalog::InMemoryBookRepository;
use crate::ledger::InMemoryTransactionRepository;
use crate::lending::LendingEngine;

/// The auth service as wired in this server
pub type LibraryAuthService = AuthService<InMemoryUserRepository, InMemorySessionRepository>;

/// The lending engine as wired in this server
pub type LibraryLendingEngine =
    LendingEngine<InMemoryBookRepository, InMemoryTransactionRepository>;
