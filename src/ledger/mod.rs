//! Transaction Ledger
//!
//! Append-mostly history of loans: who borrowed what, when it is due,
//! and whether it came back. Entries are never deleted; a return flips
//! an entry's status, it does not remove it.

mod errors;
mod transaction;

pub use errors::{LedgerError, LedgerResult};
pub use transaction::{
    InMemoryTransactionRepository, LoanStatus, Transaction, TransactionRepository,
};
