//! Scalar values and row shapes crossing the tool boundary.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

// ─── Scalar ──────────────────────────────────────────────────────────────────

/// A single cell value. Serialises to/from a plain JSON scalar; timestamps
/// travel as RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Null,
  Bool(bool),
  Integer(i64),
  Real(f64),
  Text(String),
}

impl Scalar {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Short type name used in learnings notes and error messages.
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Bool(_) => "boolean",
      Self::Integer(_) => "integer",
      Self::Real(_) => "real",
      Self::Text(_) => "text",
    }
  }
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Null => Ok(()),
      Self::Bool(b) => write!(f, "{b}"),
      Self::Integer(i) => write!(f, "{i}"),
      Self::Real(r) => write!(f, "{r}"),
      Self::Text(t) => f.write_str(t),
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One record: a mapping from column name to scalar value.
pub type Row = BTreeMap<String, Scalar>;

/// The ordered result of a read-only query. Column order follows the
/// statement's select list; rows are returned without any implicit cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Scalar>>,
}

impl QueryOutput {
  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  /// Re-shape each row into a column→value record.
  pub fn records(&self) -> Vec<Row> {
    self
      .rows
      .iter()
      .map(|row| {
        self
          .columns
          .iter()
          .cloned()
          .zip(row.iter().cloned())
          .collect()
      })
      .collect()
  }
}
