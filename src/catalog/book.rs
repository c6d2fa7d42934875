//! Book model and repository
//!
//! ## Invariants
//! - CAT1: name and author are required, non-empty
//! - CAT2: availability is flipped only through `set_availability`
//! - CAT3: every mutation reaches the journal before the call returns

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{ChangeRecord, EntityKind, Journal};

use super::errors::{CatalogError, CatalogResult};

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Unique book identifier
    pub id: Uuid,

    /// Book title
    pub name: String,

    /// Book author
    pub author: String,

    /// Whether the book can currently be issued
    pub availability: bool,

    /// When the book was added to the catalog
    pub created_at: DateTime<Utc>,

    /// When the book was last updated
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Create a new catalog entry, validating required fields
    pub fn new(name: &str, author: &str, availability: bool) -> CatalogResult<Self> {
        let name = name.trim();
        let author = author.trim();

        if name.is_empty() {
            return Err(CatalogError::Validation("Book name is required".to_string()));
        }
        if author.is_empty() {
            return Err(CatalogError::Validation(
                "Book author is required".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            author: author.to_string(),
            availability,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Book creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub name: String,
    pub author: String,
    /// Defaults to available
    #[serde(default = "default_availability")]
    pub availability: bool,
}

fn default_availability() -> bool {
    true
}

/// Book repository trait
///
/// Abstracts storage operations for catalog entries.
pub trait BookRepository: Send + Sync {
    /// Find a book by its ID
    fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Book>>;

    /// List all books
    fn list(&self) -> CatalogResult<Vec<Book>>;

    /// Add a book to the catalog
    fn create(&self, book: &Book) -> CatalogResult<()>;

    /// Flip the availability flag, returning the updated book.
    ///
    /// Lending-engine callers only (CAT2).
    fn set_availability(&self, id: Uuid, available: bool) -> CatalogResult<Option<Book>>;

    /// Remove a book, returning it if it existed
    fn remove(&self, id: Uuid) -> CatalogResult<Option<Book>>;
}

/// In-memory book repository, optionally journaled
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: RwLock<Vec<Book>>,
    journal: Option<Arc<Journal>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository whose mutations are appended to `journal`
    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            books: RwLock::new(Vec::new()),
            journal: Some(journal),
        }
    }

    /// Insert or replace a book during journal replay (no re-journaling)
    pub fn restore(&self, book: Book) -> CatalogResult<()> {
        let mut books = self.write_locked()?;
        if let Some(existing) = books.iter_mut().find(|b| b.id == book.id) {
            *existing = book;
        } else {
            books.push(book);
        }
        Ok(())
    }

    /// Drop a book during journal replay (no re-journaling)
    pub fn restore_remove(&self, id: Uuid) -> CatalogResult<()> {
        self.write_locked()?.retain(|b| b.id != id);
        Ok(())
    }

    fn write_locked(&self) -> CatalogResult<std::sync::RwLockWriteGuard<'_, Vec<Book>>> {
        self.books
            .write()
            .map_err(|_| CatalogError::Storage("Lock poisoned".to_string()))
    }

    fn journal_put(&self, book: &Book) -> CatalogResult<()> {
        if let Some(journal) = &self.journal {
            let payload = serde_json::to_vec(book)
                .map_err(|e| CatalogError::Storage(e.to_string()))?;
            journal
                .append(&ChangeRecord::put(
                    EntityKind::Book,
                    book.id.to_string(),
                    payload,
                ))
                .map_err(|e| CatalogError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    fn journal_delete(&self, id: Uuid) -> CatalogResult<()> {
        if let Some(journal) = &self.journal {
            journal
                .append(&ChangeRecord::delete(EntityKind::Book, id.to_string()))
                .map_err(|e| CatalogError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

impl BookRepository for InMemoryBookRepository {
    fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Book>> {
        let books = self
            .books
            .read()
            .map_err(|_| CatalogError::Storage("Lock poisoned".to_string()))?;
        Ok(books.iter().find(|b| b.id == id).cloned())
    }

    fn list(&self) -> CatalogResult<Vec<Book>> {
        let books = self
            .books
            .read()
            .map_err(|_| CatalogError::Storage("Lock poisoned".to_string()))?;
        Ok(books.clone())
    }

    fn create(&self, book: &Book) -> CatalogResult<()> {
        self.write_locked()?.push(book.clone());
        self.journal_put(book)
    }

    fn set_availability(&self, id: Uuid, available: bool) -> CatalogResult<Option<Book>> {
        let updated = {
            let mut books = self.write_locked()?;
            match books.iter_mut().find(|b| b.id == id) {
                Some(book) => {
                    book.availability = available;
                    book.updated_at = Utc::now();
                    Some(book.clone())
                }
                None => None,
            }
        };

        if let Some(book) = &updated {
            self.journal_put(book)?;
        }
        Ok(updated)
    }

    fn remove(&self, id: Uuid) -> CatalogResult<Option<Book>> {
        let removed = {
            let mut books = self.write_locked()?;
            let removed = books.iter().find(|b| b.id == id).cloned();
            books.retain(|b| b.id != id);
            removed
        };

        if removed.is_some() {
            self.journal_delete(id)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_creation() {
        let book = Book::new("Book 1", "Author 1", true).unwrap();

        assert_eq!(book.name, "Book 1");
        assert_eq!(book.author, "Author 1");
        assert!(book.availability);
    }

    #[test]
    fn test_book_fields_trimmed() {
        let book = Book::new("  Book 1  ", " Author 1 ", true).unwrap();
        assert_eq!(book.name, "Book 1");
        assert_eq!(book.author, "Author 1");
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Book::new("   ", "Author 1", true);
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_empty_author_rejected() {
        let result = Book::new("Book 1", "", true);
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_in_memory_repository() {
        let repo = InMemoryBookRepository::new();

        let book = Book::new("Book 1", "Author 1", true).unwrap();
        let book_id = book.id;
        repo.create(&book).unwrap();

        let found = repo.find_by_id(book_id).unwrap().unwrap();
        assert_eq!(found.name, "Book 1");

        assert_eq!(repo.list().unwrap().len(), 1);

        let updated = repo.set_availability(book_id, false).unwrap().unwrap();
        assert!(!updated.availability);
        assert!(updated.updated_at >= updated.created_at);

        let removed = repo.remove(book_id).unwrap().unwrap();
        assert_eq!(removed.id, book_id);
        assert!(repo.find_by_id(book_id).unwrap().is_none());
    }

    #[test]
    fn test_set_availability_missing_book() {
        let repo = InMemoryBookRepository::new();
        let result = repo.set_availability(Uuid::new_v4(), false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_journaled_mutations_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.journal");

        let book_id;
        {
            let journal = Arc::new(Journal::open(&path).unwrap());
            let repo = InMemoryBookRepository::with_journal(journal);

            let book = Book::new("Book 1", "Author 1", true).unwrap();
            book_id = book.id;
            repo.create(&book).unwrap();
            repo.set_availability(book_id, false).unwrap();

            let other = Book::new("Book 2", "Author 2", true).unwrap();
            repo.create(&other).unwrap();
            repo.remove(other.id).unwrap();
        }

        let records = Journal::replay(&path).unwrap();
        assert_eq!(records.len(), 4);

        // Rebuild a fresh repository from the records
        let repo = InMemoryBookRepository::new();
        for record in records {
            match record.op {
                crate::storage::ChangeOp::Put => {
                    let book: Book = serde_json::from_slice(&record.payload).unwrap();
                    repo.restore(book).unwrap();
                }
                crate::storage::ChangeOp::Delete => {
                    let id = Uuid::parse_str(&record.entity_id).unwrap();
                    repo.restore_remove(id).unwrap();
                }
            }
        }

        let books = repo.list().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, book_id);
        assert!(!books[0].availability);
    }
}
