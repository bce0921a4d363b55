//! DDL construction and schema-operation application.
//!
//! All functions here run inside the caller's transaction. SQLite has no
//! `ALTER COLUMN TYPE`, so a retype rebuilds the table (create shadow,
//! copy with a cast, drop, rename) — still atomic within the transaction.

use rusqlite::Connection;
use tally_core::{
  Error as CoreError,
  column::ColumnSpec,
  mutation::SchemaOp,
  table::{CREATED_AT_COLUMN, DATE_COLUMN, ID_COLUMN},
};

use crate::{
  Result,
  catalog::{CatalogColumn, table_columns},
  encode::{encode_column_type, quote_ident},
  metadata,
};

// ─── DDL construction ────────────────────────────────────────────────────────

/// Column definition lines for a fresh table: the invariant frame with the
/// caller columns in their given order.
pub fn table_ddl(name: &str, columns: &[ColumnSpec]) -> String {
  let mut defs = vec![
    format!("{} TEXT PRIMARY KEY", quote_ident(ID_COLUMN)),
    format!("{} TIMESTAMP NOT NULL", quote_ident(DATE_COLUMN)),
  ];
  for col in columns {
    defs.push(column_def(
      &col.name,
      encode_column_type(col.column_type),
      col.required,
    ));
  }
  defs.push(format!(
    "{} TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
    quote_ident(CREATED_AT_COLUMN)
  ));

  format!("CREATE TABLE {} (\n  {}\n)", quote_ident(name), defs.join(",\n  "))
}

fn column_def(name: &str, sql_type: &str, not_null: bool) -> String {
  let mut def = format!("{} {sql_type}", quote_ident(name));
  if not_null {
    def.push_str(" NOT NULL");
  }
  def
}

/// Rebuild a catalog column's definition line, preserving the invariant
/// columns' special shape.
fn catalog_column_def(col: &CatalogColumn) -> String {
  match col.name.as_str() {
    ID_COLUMN => format!("{} TEXT PRIMARY KEY", quote_ident(ID_COLUMN)),
    CREATED_AT_COLUMN => format!(
      "{} TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
      quote_ident(CREATED_AT_COLUMN)
    ),
    _ => column_def(&col.name, &col.decl_type, col.not_null),
  }
}

// ─── Operation application ───────────────────────────────────────────────────

/// Apply one schema operation to `table`, keeping `_column_metadata` in
/// step. Returns the confirmation line for the change log.
pub fn apply_op(conn: &Connection, table: &str, op: &SchemaOp) -> Result<String> {
  match op {
    SchemaOp::AddColumn { column } => add_column(conn, table, column)?,
    SchemaOp::RenameColumn { name, new_name } => {
      rename_column(conn, table, name, new_name)?;
    }
    SchemaOp::RetypeColumn { name, new_type } => {
      retype_column(conn, table, name, encode_column_type(*new_type))?;
      metadata::retype_column_metadata(conn, table, name, *new_type)?;
    }
    SchemaOp::DropColumn { name } => drop_column(conn, table, name)?,
  }
  Ok(op.describe())
}

fn existing_column<'c>(
  columns: &'c [CatalogColumn],
  table: &str,
  name: &str,
) -> Result<&'c CatalogColumn> {
  columns
    .iter()
    .find(|c| c.name == name)
    .ok_or_else(|| {
      CoreError::ColumnNotFound {
        table:  table.to_owned(),
        column: name.to_owned(),
      }
      .into()
    })
}

fn add_column(conn: &Connection, table: &str, spec: &ColumnSpec) -> Result<()> {
  let columns = table_columns(conn, table)?;
  if columns.iter().any(|c| c.name == spec.name) {
    return Err(
      CoreError::ColumnExists {
        table:  table.to_owned(),
        column: spec.name.clone(),
      }
      .into(),
    );
  }

  // NOT NULL cannot be added retroactively without a default; an added
  // column is always nullable regardless of `required`.
  conn.execute_batch(&format!(
    "ALTER TABLE {} ADD COLUMN {}",
    quote_ident(table),
    column_def(&spec.name, encode_column_type(spec.column_type), false)
  ))?;
  metadata::upsert_column_metadata(conn, table, spec)?;
  Ok(())
}

fn rename_column(
  conn: &Connection,
  table: &str,
  old: &str,
  new: &str,
) -> Result<()> {
  let columns = table_columns(conn, table)?;
  existing_column(&columns, table, old)?;
  if columns.iter().any(|c| c.name == new) {
    return Err(
      CoreError::ColumnExists {
        table:  table.to_owned(),
        column: new.to_owned(),
      }
      .into(),
    );
  }

  conn.execute_batch(&format!(
    "ALTER TABLE {} RENAME COLUMN {} TO {}",
    quote_ident(table),
    quote_ident(old),
    quote_ident(new)
  ))?;
  metadata::rename_column_metadata(conn, table, old, new)?;
  Ok(())
}

/// Rebuild `table` with `column` redeclared as `new_sql_type`, copying all
/// rows with a cast on the retyped column.
fn retype_column(
  conn: &Connection,
  table: &str,
  column: &str,
  new_sql_type: &str,
) -> Result<()> {
  let columns = table_columns(conn, table)?;
  existing_column(&columns, table, column)?;

  let shadow = format!("_rebuild_{table}");
  let defs: Vec<String> = columns
    .iter()
    .map(|c| {
      if c.name == column {
        column_def(&c.name, new_sql_type, c.not_null)
      } else {
        catalog_column_def(c)
      }
    })
    .collect();

  let select_list: Vec<String> = columns
    .iter()
    .map(|c| {
      if c.name == column {
        format!("CAST({} AS {new_sql_type})", quote_ident(&c.name))
      } else {
        quote_ident(&c.name)
      }
    })
    .collect();
  let column_list: Vec<String> =
    columns.iter().map(|c| quote_ident(&c.name)).collect();

  conn.execute_batch(&format!(
    "CREATE TABLE {shadow_q} (\n  {defs}\n);
     INSERT INTO {shadow_q} ({columns}) SELECT {select} FROM {table_q};
     DROP TABLE {table_q};
     ALTER TABLE {shadow_q} RENAME TO {table_q};",
    shadow_q = quote_ident(&shadow),
    table_q = quote_ident(table),
    defs = defs.join(",\n  "),
    columns = column_list.join(", "),
    select = select_list.join(", "),
  ))?;
  Ok(())
}

fn drop_column(conn: &Connection, table: &str, name: &str) -> Result<()> {
  let columns = table_columns(conn, table)?;
  existing_column(&columns, table, name)?;

  conn.execute_batch(&format!(
    "ALTER TABLE {} DROP COLUMN {}",
    quote_ident(table),
    quote_ident(name)
  ))?;
  metadata::delete_column_metadata(conn, table, name)?;
  Ok(())
}
