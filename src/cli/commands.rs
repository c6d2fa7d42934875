//! CLI command implementations
//!
//! Boot sequence for `serve`: load config, replay the journal, hydrate
//! the in-memory stores, seed the catalog on first run, bootstrap the
//! admin account, then serve HTTP until interrupted.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{
    generate_token, AuthService, InMemorySessionRepository, InMemoryUserRepository,
    JournaledUser, JwtConfig, Role, SessionConfig, User,
};
use crate::catalog::{Book, BookRepository, InMemoryBookRepository};
use crate::http_server::{AppContext, HttpServer, HttpServerConfig};
use crate::ledger::{InMemoryTransactionRepository, Transaction};
use crate::lending::LendingConfig;
use crate::observability::Logger;
use crate::storage::{ChangeOp, ChangeRecord, EntityKind, Journal};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Journal file name inside the data directory
const JOURNAL_FILE: &str = "changes.journal";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory; empty string serves from memory only
    #[serde(default)]
    pub data_dir: String,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (empty = permissive, for development)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Secret for signing access tokens (required)
    pub jwt_secret: String,

    /// Loan period in days
    #[serde(default = "default_loan_period_days")]
    pub loan_period_days: i64,

    /// Admin account created on first boot
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Bootstrap admin credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_loan_period_days() -> i64 {
    14
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> CliResult<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(CliError::config_error("jwt_secret must not be empty"));
        }
        if self.port == 0 {
            return Err(CliError::config_error("port must be > 0"));
        }
        if self.loan_period_days <= 0 {
            return Err(CliError::config_error("loan_period_days must be > 0"));
        }
        Ok(())
    }

    /// Path to the journal file, None when serving from memory
    pub fn journal_path(&self) -> Option<PathBuf> {
        if self.data_dir.is_empty() {
            None
        } else {
            Some(Path::new(&self.data_dir).join(JOURNAL_FILE))
        }
    }

    fn http_config(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
        }
    }

    fn lending_config(&self) -> LendingConfig {
        LendingConfig {
            loan_period: Duration::days(self.loan_period_days),
        }
    }
}

/// Parse arguments and dispatch the chosen command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match cli.command {
        Command::Init { config } => init(&config),
        Command::Serve { config } => serve(&config),
    }
}

/// Write a starter configuration and create the data directory
pub fn init(config_path: &Path) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::AlreadyInitialized(format!(
            "{} already exists",
            config_path.display()
        )));
    }

    let config = Config {
        data_dir: "./biblion-data".to_string(),
        host: default_host(),
        port: default_port(),
        cors_origins: Vec::new(),
        jwt_secret: generate_token(),
        loan_period_days: default_loan_period_days(),
        bootstrap_admin: Some(BootstrapAdmin {
            username: "admin".to_string(),
            password: generate_token(),
        }),
    };

    fs::create_dir_all(&config.data_dir)
        .map_err(|e| CliError::io_error(format!("Failed to create data dir: {}", e)))?;

    let content = serde_json::to_string_pretty(&config)
        .map_err(|e| CliError::io_error(e.to_string()))?;
    fs::write(config_path, content)
        .map_err(|e| CliError::io_error(format!("Failed to write config: {}", e)))?;

    println!("Wrote {}", config_path.display());
    Ok(())
}

/// Boot the service and serve HTTP until interrupted
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let http_config = config.http_config();
    let context = boot(&config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to start runtime: {}", e)))?;

    runtime
        .block_on(HttpServer::new(http_config, context).start())
        .map_err(|e| CliError::boot_failed(e.to_string()))
}

/// Build the application state: replay, hydrate, seed, bootstrap
pub fn boot(config: &Config) -> CliResult<AppContext> {
    let journal_path = config.journal_path();

    // Replay before opening the journal for appends
    let records = match &journal_path {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .map_err(|e| CliError::io_error(format!("Failed to create data dir: {}", e)))?;
            }
            Journal::replay(path).map_err(|e| CliError::boot_failed(e.to_string()))?
        }
        None => Vec::new(),
    };

    let journal = match &journal_path {
        Some(path) => Some(Arc::new(
            Journal::open(path).map_err(|e| CliError::boot_failed(e.to_string()))?,
        )),
        None => None,
    };

    let (books, ledger, users) = match journal {
        Some(journal) => (
            Arc::new(InMemoryBookRepository::with_journal(Arc::clone(&journal))),
            Arc::new(InMemoryTransactionRepository::with_journal(Arc::clone(
                &journal,
            ))),
            Arc::new(InMemoryUserRepository::with_journal(journal)),
        ),
        None => (
            Arc::new(InMemoryBookRepository::new()),
            Arc::new(InMemoryTransactionRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        ),
    };

    let record_count = records.len().to_string();
    hydrate(records, &books, &ledger, &users)?;
    Logger::info("JOURNAL_REPLAYED", &[("records", &record_count)]);

    let auth_service = AuthService::new(
        Arc::clone(&users),
        InMemorySessionRepository::new(),
        JwtConfig::with_secret(config.jwt_secret.clone()),
        SessionConfig::default(),
    );

    seed_catalog(&books)?;
    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&auth_service, &users, admin)?;
    }

    Ok(AppContext::new(
        auth_service,
        books,
        ledger,
        config.lending_config(),
    ))
}

/// Apply replayed change records to the in-memory stores
fn hydrate(
    records: Vec<ChangeRecord>,
    books: &InMemoryBookRepository,
    ledger: &InMemoryTransactionRepository,
    users: &InMemoryUserRepository,
) -> CliResult<()> {
    for record in records {
        match (record.entity, record.op) {
            (EntityKind::Book, ChangeOp::Put) => {
                let book: Book = decode(&record.payload)?;
                books
                    .restore(book)
                    .map_err(|e| CliError::boot_failed(e.to_string()))?;
            }
            (EntityKind::Book, ChangeOp::Delete) => {
                let id = decode_id(&record.entity_id)?;
                books
                    .restore_remove(id)
                    .map_err(|e| CliError::boot_failed(e.to_string()))?;
            }
            (EntityKind::Transaction, ChangeOp::Put) => {
                let transaction: Transaction = decode(&record.payload)?;
                ledger
                    .restore(transaction)
                    .map_err(|e| CliError::boot_failed(e.to_string()))?;
            }
            (EntityKind::User, ChangeOp::Put) => {
                let journaled: JournaledUser = decode(&record.payload)?;
                users
                    .restore(User::from(journaled))
                    .map_err(|e| CliError::boot_failed(e.to_string()))?;
            }
            (entity, ChangeOp::Delete) => {
                // Ledger entries and accounts are never deleted
                Logger::warn(
                    "JOURNAL_RECORD_SKIPPED",
                    &[("entity", &format!("{:?}", entity)), ("id", &record.entity_id)],
                );
            }
        }
    }
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> CliResult<T> {
    serde_json::from_slice(payload)
        .map_err(|e| CliError::boot_failed(format!("Bad journal payload: {}", e)))
}

fn decode_id(entity_id: &str) -> CliResult<Uuid> {
    Uuid::parse_str(entity_id)
        .map_err(|e| CliError::boot_failed(format!("Bad journal entity id: {}", e)))
}

/// Seed the catalog on first run
fn seed_catalog(books: &InMemoryBookRepository) -> CliResult<()> {
    let existing = books
        .list()
        .map_err(|e| CliError::boot_failed(e.to_string()))?;
    if !existing.is_empty() {
        return Ok(());
    }

    for (name, author) in [("Book 1", "Author 1"), ("Book 2", "Author 2")] {
        let book = Book::new(name, author, true)
            .map_err(|e| CliError::boot_failed(e.to_string()))?;
        books
            .create(&book)
            .map_err(|e| CliError::boot_failed(e.to_string()))?;
    }

    Logger::info("CATALOG_SEEDED", &[("books", "2")]);
    Ok(())
}

/// Create the admin account on first boot
fn bootstrap_admin(
    auth_service: &AuthService<InMemoryUserRepository, InMemorySessionRepository>,
    users: &InMemoryUserRepository,
    admin: &BootstrapAdmin,
) -> CliResult<()> {
    use crate::auth::UserRepository;

    let exists = users
        .username_exists(&admin.username)
        .map_err(|e| CliError::boot_failed(e.to_string()))?;
    if exists {
        return Ok(());
    }

    auth_service
        .create_user(&admin.username, &admin.password, Role::Admin)
        .map_err(|e| CliError::boot_failed(e.to_string()))?;

    Logger::info("ADMIN_BOOTSTRAPPED", &[("username", &admin.username)]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LoginRequest;
    use crate::ledger::TransactionRepository;

    fn memory_config() -> Config {
        Config {
            data_dir: String::new(),
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            jwt_secret: "test_secret_key_for_testing_only".to_string(),
            loan_period_days: 14,
            bootstrap_admin: Some(BootstrapAdmin {
                username: "admin".to_string(),
                password: "admin_password".to_string(),
            }),
        }
    }

    #[test]
    fn test_config_load_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biblion.json");

        fs::write(
            &path,
            r#"{"jwt_secret": "s3cret", "port": 8080, "data_dir": ""}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.loan_period_days, 14);
        assert!(config.journal_path().is_none());
    }

    #[test]
    fn test_config_rejects_empty_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biblion.json");

        fs::write(&path, r#"{"jwt_secret": "  "}"#).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_config_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_current_dir(&dir).ok();
        let path = dir.path().join("biblion.json");

        init(&path).unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.jwt_secret.is_empty());
        assert!(config.bootstrap_admin.is_some());

        // Second init refuses to clobber
        let result = init(&path);
        assert!(matches!(result, Err(CliError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_boot_seeds_catalog_and_admin() {
        let config = memory_config();
        let context = boot(&config).unwrap();

        let books = context.catalog.books.list().unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].name, "Book 1");
        assert!(books.iter().all(|b| b.availability));

        // Bootstrap admin can log in and passes the admin gate
        let (_, tokens) = context
            .auth
            .service
            .login(LoginRequest {
                username: "admin".to_string(),
                password: "admin_password".to_string(),
            })
            .unwrap();
        let principal = context
            .auth
            .service
            .validate_access_token(&tokens.access_token)
            .unwrap();
        assert!(principal.require_admin().is_ok());
    }

    #[test]
    fn test_boot_replays_lending_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = memory_config();
        config.data_dir = dir.path().to_str().unwrap().to_string();

        let user_id = Uuid::new_v4();
        let book_id;
        {
            let context = boot(&config).unwrap();
            let books = context.catalog.books.list().unwrap();
            book_id = books[0].id;
            context.lending.engine.issue(user_id, book_id).unwrap();
        }

        // A fresh boot sees the issued book and its open loan
        let context = boot(&config).unwrap();
        let book = context
            .catalog
            .books
            .find_by_id(book_id)
            .unwrap()
            .unwrap();
        assert!(!book.availability);

        let open = context
            .catalog
            .ledger
            .find_open_loan(user_id, book_id)
            .unwrap();
        assert!(open.is_some());

        // Catalog is not re-seeded on top of replayed state
        assert_eq!(context.catalog.books.list().unwrap().len(), 2);
    }
}
