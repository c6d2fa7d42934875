//! Durable record store for biblion
//!
//! An append-only change journal. Every catalog and ledger mutation is
//! appended as a checksummed record; replaying the journal at boot
//! rebuilds the in-memory state.

mod errors;
mod journal;

pub use errors::{JournalError, JournalResult};
pub use journal::{ChangeOp, ChangeRecord, EntityKind, Journal};
