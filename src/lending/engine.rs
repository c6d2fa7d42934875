//! The lending state machine
//!
//! Each book is either Available (availability flag true, no open loan)
//! or OnLoan (flag false, one open loan). `issue` and `return_book`
//! move a book between the two states, mutating the registry and the
//! ledger together.
//!
//! ## Invariants
//! - LEND1: A book is never issued to two borrowers at once
//! - LEND2: Registry and ledger commit together or the operation fails
//!   (compensating rollback on partial failure)
//! - LEND3: Read-check-write runs inside the book's critical section
//!
//! The admin paths are asymmetric on purpose: an admin issue marks a
//! book out of circulation without a ledger entry (a desk checkout with
//! no borrower account). An admin return closes the book's open loan
//! when one exists, so the ledger cannot be left claiming a borrowed
//! book that sits on the shelf.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::catalog::{Book, BookRepository};
use crate::ledger::{Transaction, TransactionRepository};
use crate::observability::Logger;

use super::errors::{LendingError, LendingResult};
use super::locks::LockRegistry;

/// Lending engine configuration
#[derive(Debug, Clone)]
pub struct LendingConfig {
    /// How long a borrower keeps a book
    pub loan_period: Duration,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            loan_period: Duration::days(14),
        }
    }
}

/// Coordinates the book registry and the transaction ledger
pub struct LendingEngine<B: BookRepository, T: TransactionRepository> {
    books: Arc<B>,
    ledger: Arc<T>,
    locks: LockRegistry,
    config: LendingConfig,
}

impl<B: BookRepository, T: TransactionRepository> LendingEngine<B, T> {
    pub fn new(books: Arc<B>, ledger: Arc<T>, config: LendingConfig) -> Self {
        Self {
            books,
            ledger,
            locks: LockRegistry::new(),
            config,
        }
    }

    /// Issue a book to a user.
    ///
    /// Flips the availability flag and opens a loan due in
    /// `loan_period`. Fails with `BookUnavailable` when the book is
    /// missing or already on loan.
    pub fn issue(&self, user_id: Uuid, book_id: Uuid) -> LendingResult<Transaction> {
        let lock = self.locks.entry(book_id);
        let _guard = lock
            .lock()
            .map_err(|_| LendingError::Storage("Lock poisoned".to_string()))?;

        match self.books.find_by_id(book_id)? {
            Some(book) if book.availability => {}
            _ => return Err(LendingError::BookUnavailable),
        }

        self.books
            .set_availability(book_id, false)?
            .ok_or(LendingError::BookUnavailable)?;

        let due_date = Utc::now() + self.config.loan_period;
        match self.ledger.open_loan(user_id, book_id, due_date) {
            Ok(transaction) => {
                self.log_transition("BOOK_ISSUED", book_id, Some(user_id));
                Ok(transaction)
            }
            Err(e) => {
                // LEND2: undo the flag flip so the registry does not
                // claim a loan the ledger never recorded
                let _ = self.books.set_availability(book_id, true);
                Err(e.into())
            }
        }
    }

    /// Mark a book out of circulation without a ledger entry.
    ///
    /// Admin path; the returned book carries the flipped flag.
    pub fn issue_unrecorded(&self, book_id: Uuid) -> LendingResult<Book> {
        let lock = self.locks.entry(book_id);
        let _guard = lock
            .lock()
            .map_err(|_| LendingError::Storage("Lock poisoned".to_string()))?;

        match self.books.find_by_id(book_id)? {
            Some(book) if book.availability => {}
            _ => return Err(LendingError::BookUnavailable),
        }

        let book = self
            .books
            .set_availability(book_id, false)?
            .ok_or(LendingError::BookUnavailable)?;

        self.log_transition("BOOK_ISSUED_UNRECORDED", book_id, None);
        Ok(book)
    }

    /// Return a book borrowed by `user_id`.
    ///
    /// Closes the user's open loan and flips the availability flag.
    /// Fails with `NoOpenLoan` when the user has no Borrowed entry for
    /// the book.
    pub fn return_book(&self, user_id: Uuid, book_id: Uuid) -> LendingResult<Transaction> {
        let lock = self.locks.entry(book_id);
        let _guard = lock
            .lock()
            .map_err(|_| LendingError::Storage("Lock poisoned".to_string()))?;

        let transaction = self
            .ledger
            .close_loan(user_id, book_id)?
            .ok_or(LendingError::NoOpenLoan)?;

        match self.books.set_availability(book_id, true) {
            Ok(Some(_)) => {
                self.log_transition("BOOK_RETURNED", book_id, Some(user_id));
                Ok(transaction)
            }
            Ok(None) => {
                // Registry lost the book while its loan was open;
                // reopen the loan rather than strand the ledger
                let _ = self.ledger.reopen_loan(transaction.id);
                Err(LendingError::Storage(format!(
                    "Book {} missing during return",
                    book_id
                )))
            }
            Err(e) => {
                let _ = self.ledger.reopen_loan(transaction.id);
                Err(e.into())
            }
        }
    }

    /// Return a book regardless of who borrowed it.
    ///
    /// Admin path. Closes the book's open loan when one exists, then
    /// marks the book available. Fails with `BookNotFound` when the
    /// book is not in the catalog.
    pub fn return_any(&self, book_id: Uuid) -> LendingResult<Book> {
        let lock = self.locks.entry(book_id);
        let _guard = lock
            .lock()
            .map_err(|_| LendingError::Storage("Lock poisoned".to_string()))?;

        if self.books.find_by_id(book_id)?.is_none() {
            return Err(LendingError::BookNotFound);
        }

        let closed = self.ledger.close_open_loan_for_book(book_id)?;

        match self.books.set_availability(book_id, true) {
            Ok(Some(book)) => {
                self.log_transition("BOOK_RETURNED_ANY", book_id, closed.map(|t| t.user_id));
                Ok(book)
            }
            Ok(None) => {
                if let Some(transaction) = closed {
                    let _ = self.ledger.reopen_loan(transaction.id);
                }
                Err(LendingError::BookNotFound)
            }
            Err(e) => {
                if let Some(transaction) = closed {
                    let _ = self.ledger.reopen_loan(transaction.id);
                }
                Err(e.into())
            }
        }
    }

    /// A user's full loan history, each entry joined with its book.
    ///
    /// The book is None when it has since been removed from the
    /// catalog; the ledger entry itself is never deleted.
    pub fn user_history(
        &self,
        user_id: Uuid,
    ) -> LendingResult<Vec<(Transaction, Option<Book>)>> {
        let transactions = self.ledger.list_for_user(user_id)?;
        let mut history = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let book = self.books.find_by_id(transaction.book_id)?;
            history.push((transaction, book));
        }
        Ok(history)
    }

    fn log_transition(&self, event: &str, book_id: Uuid, user_id: Option<Uuid>) {
        let book_id = book_id.to_string();
        match user_id {
            Some(user_id) => {
                let user_id = user_id.to_string();
                Logger::info(event, &[("book_id", &book_id), ("user_id", &user_id)]);
            }
            None => Logger::info(event, &[("book_id", &book_id)]),
        }
    }
}
