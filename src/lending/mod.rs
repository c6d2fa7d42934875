//! Lending Engine
//!
//! Coordinates the book registry and the transaction ledger so that an
//! issue or return is a single logical operation. Each book is a small
//! state machine (Available or OnLoan) and the engine owns every
//! transition.

mod engine;
mod errors;
mod locks;

pub use engine::{LendingConfig, LendingEngine};
pub use errors::{LendingError, LendingResult};
pub use locks::LockRegistry;
