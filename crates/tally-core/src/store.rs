//! The `LogStore` trait and supporting error plumbing.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-api`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  error::Reason,
  mutation::{SchemaChange, SchemaOp},
  table::{NewTable, TableDetail, TableSummary},
  value::{QueryOutput, Row},
};

// ─── Error seam ──────────────────────────────────────────────────────────────

/// Implemented by every backend error type so the tool surface can turn any
/// failure into a machine-checkable reason string without knowing the
/// backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn reason(&self) -> Reason;
}

impl StoreError for crate::Error {
  fn reason(&self) -> Reason { crate::Error::reason(self) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tally logging store backend.
///
/// The five operations map 1:1 onto the tool surface an agent calls:
/// discover (`list_tables` / `describe_table`), evolve (`create_table` /
/// `edit_schema`), store (`insert_rows`), analyze (`query`).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LogStore: Send + Sync {
  type Error: StoreError;

  /// Overview of every user table: name, description, purpose, column
  /// count.
  fn list_tables(
    &self,
  ) -> impl Future<Output = Result<Vec<TableSummary>, Self::Error>> + Send + '_;

  /// Full detail for one table: metadata, columns in catalog order, and
  /// the most recent rows. Fails with a not-found error if the table does
  /// not exist.
  fn describe_table<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<TableDetail, Self::Error>> + Send + 'a;

  /// Create a table with the invariant column frame (`id`, `date`, caller
  /// columns in order, `created_at`) plus its metadata rows, atomically.
  fn create_table(
    &self,
    spec: NewTable,
  ) -> impl Future<Output = Result<TableDetail, Self::Error>> + Send + '_;

  /// Apply an ordered list of column operations as one atomic unit,
  /// keeping column metadata in step within the same transaction.
  fn edit_schema<'a>(
    &'a self,
    table: &'a str,
    ops: Vec<SchemaOp>,
  ) -> impl Future<Output = Result<SchemaChange, Self::Error>> + Send + 'a;

  /// Insert one batch of records atomically. Returns the generated row ids
  /// in input order. A best-effort learnings update follows the commit and
  /// never fails the insert.
  fn insert_rows<'a>(
    &'a self,
    table: &'a str,
    rows: Vec<Row>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + 'a;

  /// Execute exactly one read-only statement and return the full ordered
  /// result set. Mutating statements are rejected before execution.
  fn query<'a>(
    &'a self,
    sql: &'a str,
  ) -> impl Future<Output = Result<QueryOutput, Self::Error>> + Send + 'a;
}
