//! Schema-edit operations and their result shape.
//!
//! An edit call carries an ordered list of operations applied as one atomic
//! unit: all succeed or none do.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  column::{ColumnSpec, ColumnType},
  ident::validate_identifier,
  table::is_invariant_column,
};

// ─── SchemaOp ────────────────────────────────────────────────────────────────

/// A single column-level schema operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SchemaOp {
  AddColumn {
    #[serde(flatten)]
    column: ColumnSpec,
  },
  RenameColumn {
    name:     String,
    new_name: String,
  },
  RetypeColumn {
    name:     String,
    new_type: ColumnType,
  },
  DropColumn {
    name: String,
  },
}

impl SchemaOp {
  /// Validate names and protection rules before any SQL is built.
  ///
  /// The three invariant columns can never be renamed, retyped, or dropped.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::AddColumn { column } => {
        validate_identifier(&column.name)?;
        if is_invariant_column(&column.name) {
          return Err(Error::Validation(format!(
            "column name {:?} collides with a standard column",
            column.name
          )));
        }
      }
      Self::RenameColumn { name, new_name } => {
        Self::ensure_alterable(name)?;
        validate_identifier(new_name)?;
        if is_invariant_column(new_name) {
          return Err(Error::Validation(format!(
            "column name {new_name:?} collides with a standard column"
          )));
        }
      }
      Self::RetypeColumn { name, .. } | Self::DropColumn { name } => {
        Self::ensure_alterable(name)?;
      }
    }
    Ok(())
  }

  fn ensure_alterable(name: &str) -> Result<()> {
    if is_invariant_column(name) {
      return Err(Error::ProtectedField(name.to_owned()));
    }
    validate_identifier(name)
  }

  /// Human-readable confirmation line for the change log returned to the
  /// caller.
  pub fn describe(&self) -> String {
    match self {
      Self::AddColumn { column } => {
        format!("added column {:?} ({})", column.name, column.column_type)
      }
      Self::RenameColumn { name, new_name } => {
        format!("renamed column {name:?} to {new_name:?}")
      }
      Self::RetypeColumn { name, new_type } => {
        format!("changed column {name:?} to {new_type}")
      }
      Self::DropColumn { name } => format!("dropped column {name:?}"),
    }
  }
}

// ─── SchemaChange ────────────────────────────────────────────────────────────

/// The result of a successful schema edit: one confirmation line per
/// applied operation, in call order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaChange {
  pub table:   String,
  pub applied: Vec<String>,
}
