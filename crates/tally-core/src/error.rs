//! Error types for `tally-core`.

use serde::Serialize;
use thiserror::Error;

/// Short machine-checkable failure category, carried to the calling agent
/// alongside the human-readable message so it can decide its next action
/// without inspecting internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
  NotFound,
  AlreadyExists,
  Validation,
  UnknownColumn,
  ProtectedField,
  ForbiddenOperation,
  QueryExecution,
  Storage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("table not found: {0:?}")]
  TableNotFound(String),

  #[error("column {column:?} does not exist on table {table:?}")]
  ColumnNotFound { table: String, column: String },

  #[error("table already exists: {0:?}")]
  TableExists(String),

  #[error("column {column:?} already exists on table {table:?}")]
  ColumnExists { table: String, column: String },

  #[error("invalid input: {0}")]
  Validation(String),

  /// An insert referenced a column the table does not have. The message
  /// tells the agent how to recover.
  #[error(
    "column {column:?} does not exist on table {table:?}; add it with a \
     schema edit before inserting"
  )]
  UnknownColumn { table: String, column: String },

  #[error("field {0:?} is managed by the store and cannot be written or altered")]
  ProtectedField(String),

  #[error("forbidden operation in query: {0}")]
  ForbiddenOperation(String),

  #[error("query failed: {0}")]
  QueryExecution(String),
}

impl Error {
  /// The machine-checkable category for this error.
  pub fn reason(&self) -> Reason {
    match self {
      Self::TableNotFound(_) | Self::ColumnNotFound { .. } => Reason::NotFound,
      Self::TableExists(_) | Self::ColumnExists { .. } => Reason::AlreadyExists,
      Self::Validation(_) => Reason::Validation,
      Self::UnknownColumn { .. } => Reason::UnknownColumn,
      Self::ProtectedField(_) => Reason::ProtectedField,
      Self::ForbiddenOperation(_) => Reason::ForbiddenOperation,
      Self::QueryExecution(_) => Reason::QueryExecution,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
