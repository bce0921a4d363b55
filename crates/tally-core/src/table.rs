//! Table shapes: creation input, overview and detail read models, and the
//! invariant-column contract every user table carries.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  column::{ColumnInfo, ColumnSpec},
  ident::validate_identifier,
  value::Row,
};

// ─── Invariant columns ───────────────────────────────────────────────────────

pub const ID_COLUMN: &str = "id";
pub const DATE_COLUMN: &str = "date";
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Columns every table has, in their fixed positions (`id` and `date` lead,
/// `created_at` trails). They can never be renamed, retyped, or dropped.
pub const INVARIANT_COLUMNS: [&str; 3] =
  [ID_COLUMN, DATE_COLUMN, CREATED_AT_COLUMN];

/// Columns whose values the store generates; caller writes are rejected.
pub const PROTECTED_FIELDS: [&str; 2] = [ID_COLUMN, CREATED_AT_COLUMN];

/// How many most-recent rows a table detail listing includes.
pub const RECENT_ROW_LIMIT: usize = 3;

pub fn is_invariant_column(name: &str) -> bool {
  INVARIANT_COLUMNS.contains(&name)
}

pub fn is_protected_field(name: &str) -> bool {
  PROTECTED_FIELDS.contains(&name)
}

// ─── NewTable ────────────────────────────────────────────────────────────────

/// Input to table creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTable {
  pub name:        String,
  pub description: String,
  #[serde(default)]
  pub purpose:     String,
  /// Caller columns, in the order they will appear between `date` and
  /// `created_at`.
  pub columns:     Vec<ColumnSpec>,
}

impl NewTable {
  /// Validate names and shape before any SQL is built.
  pub fn validate(&self) -> Result<()> {
    validate_identifier(&self.name)?;

    if self.columns.is_empty() {
      return Err(Error::Validation(
        "a table needs at least one caller-defined column".into(),
      ));
    }

    let mut seen = Vec::with_capacity(self.columns.len());
    for col in &self.columns {
      validate_identifier(&col.name)?;
      if is_invariant_column(&col.name) {
        return Err(Error::Validation(format!(
          "column name {:?} collides with a standard column; every table \
           already has id, date, and created_at",
          col.name
        )));
      }
      if seen.contains(&col.name.as_str()) {
        return Err(Error::Validation(format!(
          "duplicate column name {:?}",
          col.name
        )));
      }
      seen.push(col.name.as_str());
    }
    Ok(())
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// One line of the all-tables overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
  pub name:         String,
  pub description:  String,
  pub purpose:      String,
  pub column_count: usize,
}

/// The full picture of a single table: metadata, columns in catalog order,
/// and the most recent rows by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDetail {
  pub name:        String,
  pub description: String,
  pub purpose:     String,
  pub columns:     Vec<ColumnInfo>,
  pub recent:      Vec<Row>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::column::ColumnType;

  fn spec(name: &str) -> ColumnSpec {
    ColumnSpec {
      name:        name.into(),
      column_type: ColumnType::Text,
      description: String::new(),
      unit:        None,
      required:    false,
    }
  }

  fn table(columns: Vec<ColumnSpec>) -> NewTable {
    NewTable {
      name: "workouts".into(),
      description: "strength sessions".into(),
      purpose: String::new(),
      columns,
    }
  }

  #[test]
  fn accepts_a_plain_table() {
    assert!(table(vec![spec("exercise"), spec("notes")]).validate().is_ok());
  }

  #[test]
  fn rejects_empty_columns() {
    let err = table(vec![]).validate().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn rejects_duplicate_columns() {
    let err = table(vec![spec("reps"), spec("reps")]).validate().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn rejects_invariant_column_names() {
    for name in INVARIANT_COLUMNS {
      let err = table(vec![spec(name)]).validate().unwrap_err();
      assert!(matches!(err, Error::Validation(_)), "{name}");
    }
  }

  #[test]
  fn rejects_bad_table_name() {
    let mut t = table(vec![spec("reps")]);
    t.name = "drop".into();
    assert!(t.validate().is_err());
  }
}
