//! Column types and specifications for user-defined tables.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── ColumnType ──────────────────────────────────────────────────────────────

/// The scalar types a caller-defined column may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Text,
  Integer,
  Real,
  Boolean,
  Timestamp,
}

impl ColumnType {
  pub const ALL: [ColumnType; 5] = [
    Self::Text,
    Self::Integer,
    Self::Real,
    Self::Boolean,
    Self::Timestamp,
  ];

  /// The lowercase name used in tool payloads and column metadata.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Integer => "integer",
      Self::Real => "real",
      Self::Boolean => "boolean",
      Self::Timestamp => "timestamp",
    }
  }
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ColumnType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "integer" => Ok(Self::Integer),
      "real" => Ok(Self::Real),
      "boolean" => Ok(Self::Boolean),
      "timestamp" => Ok(Self::Timestamp),
      other => Err(Error::Validation(format!(
        "unrecognized column type {other:?} (expected one of: text, \
         integer, real, boolean, timestamp)"
      ))),
    }
  }
}

// ─── ColumnSpec ──────────────────────────────────────────────────────────────

/// A caller-supplied column definition, as accepted by table creation and
/// the `add_column` schema operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
  pub name:        String,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
  pub description: String,
  pub unit:        Option<String>,
  /// If `true`, the column is created NOT NULL.
  #[serde(default)]
  pub required:    bool,
}

// ─── ColumnInfo ──────────────────────────────────────────────────────────────

/// A column as reported by the catalog reader: the live declared type plus
/// the metadata recorded for it. Invariant columns carry no metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
  pub name:        String,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
  pub description: Option<String>,
  pub unit:        Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_all_types_case_insensitively() {
    for ty in ColumnType::ALL {
      assert_eq!(ty.as_str().parse::<ColumnType>().unwrap(), ty);
      assert_eq!(
        ty.as_str().to_uppercase().parse::<ColumnType>().unwrap(),
        ty
      );
    }
  }

  #[test]
  fn rejects_unknown_type() {
    let err = "varchar".parse::<ColumnType>().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
