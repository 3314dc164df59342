//! SQLite backend for the asset request tracker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every workflow mutation is a
//! single `BEGIN IMMEDIATE` transaction, which also serialises request
//! number allocation across connections to the same file.

mod audit;
mod encode;
mod schema;
mod sequence;
mod store;

pub mod error;

pub use audit::SqliteAuditLog;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
