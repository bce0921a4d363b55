//! SQLite backend for the Tally logging store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Every multi-statement operation
//! (table creation plus metadata, batch schema edits, batch inserts) runs in
//! a single transaction; failure anywhere rolls the whole call back.

mod catalog;
mod encode;
mod guard;
mod metadata;
mod mutate;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
