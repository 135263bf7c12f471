//! # Remit Repo
//!
//! SQLite persistence adapter for the transfer engine. Implements the
//! `TransferRepository` port from `remit-types`; the engine never sees
//! SQL or connection pools.

pub mod sqlite;

mod types;

#[cfg(test)]
mod sqlite_tests;

pub use sqlite::SqliteRepo;
