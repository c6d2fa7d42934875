//! HTTP server assembly
//!
//! Wires the auth service, book registry, transaction ledger, and
//! lending engine into one router and serves it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{AuthService, InMemorySessionRepository, InMemoryUserRepository, JwtConfig, SessionConfig};
use crate::catalog::InMemoryBookRepository;
use crate::ledger::InMemoryTransactionRepository;
use crate::lending::{LendingConfig, LendingEngine};
use crate::observability::Logger;

use super::auth_routes::{auth_routes, AuthState};
use super::catalog_routes::{catalog_routes, CatalogState};
use super::config::HttpServerConfig;
use super::lending_routes::{lending_routes, LendingState};
use super::LibraryAuthService;

/// The wired-together application state shared by all routers
pub struct AppContext {
    pub auth: Arc<AuthState>,
    pub catalog: Arc<CatalogState>,
    pub lending: Arc<LendingState>,
}

impl AppContext {
    /// Wire the services and repositories into router states
    pub fn new(
        auth_service: LibraryAuthService,
        books: Arc<InMemoryBookRepository>,
        ledger: Arc<InMemoryTransactionRepository>,
        lending_config: LendingConfig,
    ) -> Self {
        let auth = Arc::new(AuthState {
            service: auth_service,
        });
        let engine = LendingEngine::new(Arc::clone(&books), Arc::clone(&ledger), lending_config);

        let catalog = Arc::new(CatalogState {
            books,
            ledger,
            auth: Arc::clone(&auth),
        });
        let lending = Arc::new(LendingState {
            engine,
            auth: Arc::clone(&auth),
        });

        Self {
            auth,
            catalog,
            lending,
        }
    }

    /// Fresh in-memory context (tests and ephemeral serving)
    pub fn in_memory(jwt_secret: &str) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let books = Arc::new(InMemoryBookRepository::new());
        let ledger = Arc::new(InMemoryTransactionRepository::new());

        let auth_service = AuthService::new(
            users,
            InMemorySessionRepository::new(),
            JwtConfig::with_secret(jwt_secret),
            SessionConfig::default(),
        );

        Self::new(auth_service, books, ledger, LendingConfig::default())
    }
}

/// HTTP server for the lending service
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server from configuration and wired state
    pub fn new(config: HttpServerConfig, context: AppContext) -> Self {
        let router = Self::build_router(&config, context);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(config: &HttpServerConfig, context: AppContext) -> Router {
        let cors = if config.cors_origins.is_empty() {
            // Permissive for development when no origins are configured
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(health_handler))
            .nest("/auth", auth_routes(context.auth))
            .nest("/books", catalog_routes(context.catalog))
            .merge(lending_routes(context.lending))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid socket address: {}", e),
            )
        })?;

        let addr_str = addr.to_string();
        Logger::info("SERVER_STARTED", &[("addr", &addr_str)]);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

/// Liveness probe
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creation() {
        let context = AppContext::in_memory("test_secret_key_for_testing_only");
        let server = HttpServer::new(HttpServerConfig::default(), context);
        assert_eq!(server.socket_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_router_builds() {
        let context = AppContext::in_memory("test_secret_key_for_testing_only");
        let server = HttpServer::new(HttpServerConfig::with_port(8080), context);
        let _router = server.router();
    }
}
