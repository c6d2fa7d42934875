//! Transaction model and repository
//!
//! ## Invariants
//! - LED1: At most one Borrowed transaction per (user, book) pair
//! - LED2: Entries are never deleted, only flipped to Returned
//! - LED3: Every mutation reaches the journal before the call returns

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{ChangeRecord, EntityKind, Journal};

use super::errors::{LedgerError, LedgerResult};

/// Loan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Borrowed,
    Returned,
}

/// One loan record in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    pub id: Uuid,

    /// User who borrowed the book
    pub user_id: Uuid,

    /// Book that was borrowed
    pub book_id: Uuid,

    /// Borrowed until returned
    pub status: LoanStatus,

    /// When the book is due back
    pub due_date: DateTime<Utc>,

    /// When the loan was opened
    pub created_at: DateTime<Utc>,

    /// When the loan was closed, if it has been
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Open a new loan
    pub fn open(user_id: Uuid, book_id: Uuid, due_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            status: LoanStatus::Borrowed,
            due_date,
            created_at: Utc::now(),
            returned_at: None,
        }
    }

    /// Whether this loan is still open
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Borrowed
    }
}

/// Transaction repository trait
pub trait TransactionRepository: Send + Sync {
    /// Open a loan for a (user, book) pair (LED1 enforced)
    fn open_loan(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        due_date: DateTime<Utc>,
    ) -> LedgerResult<Transaction>;

    /// Close the open loan for a (user, book) pair.
    ///
    /// Returns None when no Borrowed entry exists for the pair, the
    /// guard against returning a book the user never borrowed.
    fn close_loan(&self, user_id: Uuid, book_id: Uuid) -> LedgerResult<Option<Transaction>>;

    /// Close whichever open loan references the book, if one exists
    fn close_open_loan_for_book(&self, book_id: Uuid) -> LedgerResult<Option<Transaction>>;

    /// Flip a closed loan back to Borrowed (compensation for a failed
    /// return; not reachable through the API)
    fn reopen_loan(&self, transaction_id: Uuid) -> LedgerResult<()>;

    /// Find the open loan for a (user, book) pair
    fn find_open_loan(&self, user_id: Uuid, book_id: Uuid) -> LedgerResult<Option<Transaction>>;

    /// Find the open loan referencing a book
    fn find_open_loan_for_book(&self, book_id: Uuid) -> LedgerResult<Option<Transaction>>;

    /// Full history for a user, oldest first
    fn list_for_user(&self, user_id: Uuid) -> LedgerResult<Vec<Transaction>>;
}

/// In-memory transaction repository, optionally journaled
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: RwLock<Vec<Transaction>>,
    journal: Option<Arc<Journal>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository whose mutations are appended to `journal`
    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            transactions: RwLock::new(Vec::new()),
            journal: Some(journal),
        }
    }

    /// Insert or replace an entry during journal replay (no re-journaling)
    pub fn restore(&self, transaction: Transaction) -> LedgerResult<()> {
        let mut transactions = self.write_locked()?;
        if let Some(existing) = transactions.iter_mut().find(|t| t.id == transaction.id) {
            *existing = transaction;
        } else {
            transactions.push(transaction);
        }
        Ok(())
    }

    fn write_locked(
        &self,
    ) -> LedgerResult<std::sync::RwLockWriteGuard<'_, Vec<Transaction>>> {
        self.transactions
            .write()
            .map_err(|_| LedgerError::Storage("Lock poisoned".to_string()))
    }

    fn read_locked(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, Vec<Transaction>>> {
        self.transactions
            .read()
            .map_err(|_| LedgerError::Storage("Lock poisoned".to_string()))
    }

    fn journal_put(&self, transaction: &Transaction) -> LedgerResult<()> {
        if let Some(journal) = &self.journal {
            let payload = serde_json::to_vec(transaction)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            journal
                .append(&ChangeRecord::put(
                    EntityKind::Transaction,
                    transaction.id.to_string(),
                    payload,
                ))
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

impl TransactionRepository for InMemoryTransactionRepository {
    fn open_loan(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        due_date: DateTime<Utc>,
    ) -> LedgerResult<Transaction> {
        let transaction = {
            let mut transactions = self.write_locked()?;
            if transactions
                .iter()
                .any(|t| t.user_id == user_id && t.book_id == book_id && t.is_open())
            {
                return Err(LedgerError::DuplicateLoan);
            }
            let transaction = Transaction::open(user_id, book_id, due_date);
            transactions.push(transaction.clone());
            transaction
        };

        self.journal_put(&transaction)?;
        Ok(transaction)
    }

    fn close_loan(&self, user_id: Uuid, book_id: Uuid) -> LedgerResult<Option<Transaction>> {
        let closed = {
            let mut transactions = self.write_locked()?;
            match transactions
                .iter_mut()
                .find(|t| t.user_id == user_id && t.book_id == book_id && t.is_open())
            {
                Some(transaction) => {
                    transaction.status = LoanStatus::Returned;
                    transaction.returned_at = Some(Utc::now());
                    Some(transaction.clone())
                }
                None => None,
            }
        };

        if let Some(transaction) = &closed {
            self.journal_put(transaction)?;
        }
        Ok(closed)
    }

    fn close_open_loan_for_book(&self, book_id: Uuid) -> LedgerResult<Option<Transaction>> {
        let closed = {
            let mut transactions = self.write_locked()?;
            match transactions
                .iter_mut()
                .find(|t| t.book_id == book_id && t.is_open())
            {
                Some(transaction) => {
                    transaction.status = LoanStatus::Returned;
                    transaction.returned_at = Some(Utc::now());
                    Some(transaction.clone())
                }
                None => None,
            }
        };

        if let Some(transaction) = &closed {
            self.journal_put(transaction)?;
        }
        Ok(closed)
    }

    fn reopen_loan(&self, transaction_id: Uuid) -> LedgerResult<()> {
        let reopened = {
            let mut transactions = self.write_locked()?;
            match transactions.iter_mut().find(|t| t.id == transaction_id) {
                Some(transaction) => {
                    transaction.status = LoanStatus::Borrowed;
                    transaction.returned_at = None;
                    Some(transaction.clone())
                }
                None => None,
            }
        };

        match reopened {
            Some(transaction) => self.journal_put(&transaction),
            None => Err(LedgerError::Storage(format!(
                "Transaction {} not found",
                transaction_id
            ))),
        }
    }

    fn find_open_loan(&self, user_id: Uuid, book_id: Uuid) -> LedgerResult<Option<Transaction>> {
        let transactions = self.read_locked()?;
        Ok(transactions
            .iter()
            .find(|t| t.user_id == user_id && t.book_id == book_id && t.is_open())
            .cloned())
    }

    fn find_open_loan_for_book(&self, book_id: Uuid) -> LedgerResult<Option<Transaction>> {
        let transactions = self.read_locked()?;
        Ok(transactions
            .iter()
            .find(|t| t.book_id == book_id && t.is_open())
            .cloned())
    }

    fn list_for_user(&self, user_id: Uuid) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.read_locked()?;
        Ok(transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}
