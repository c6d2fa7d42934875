//! biblion - a small, self-hostable library lending service
//!
//! A catalog of books, a transaction ledger, and the lending engine
//! that keeps the two consistent while users and administrators issue
//! and return books over HTTP.

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod http_server;
pub mod ledger;
pub mod lending;
pub mod observability;
pub mod storage;
