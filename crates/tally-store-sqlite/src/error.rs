//! Error type for `tally-store-sqlite`.

use tally_core::{Reason, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A contract error from the taxonomy in `tally-core`.
  #[error(transparent)]
  Core(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored value failed to decode (timestamp, declared type, learnings
  /// blob). Indicates the database was modified outside this layer.
  #[error("corrupt stored value: {0}")]
  Corrupt(String),
}

impl StoreError for Error {
  fn reason(&self) -> Reason {
    match self {
      Self::Core(e) => e.reason(),
      _ => Reason::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
