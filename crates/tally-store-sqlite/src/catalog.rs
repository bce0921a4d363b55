//! Catalog reads against SQLite's system tables.
//!
//! User tables are everything in `sqlite_master` outside the `sqlite_*` and
//! leading-underscore namespaces. Column shape comes from
//! `PRAGMA table_info`, which reports columns in definition order.

use rusqlite::Connection;

use crate::{Result, encode::quote_ident};

/// A column as the live catalog reports it.
#[derive(Debug, Clone)]
pub struct CatalogColumn {
  pub name:      String,
  /// Declared type from the DDL, e.g. `TEXT`, `REAL`, `TIMESTAMP`.
  pub decl_type: String,
  pub not_null:  bool,
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
  let mut stmt = conn.prepare(
    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
  )?;
  Ok(stmt.exists([table])?)
}

/// Names of all user tables, sorted.
pub fn user_tables(conn: &Connection) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT name FROM sqlite_master
     WHERE type = 'table'
       AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
       AND name NOT LIKE '\\_%' ESCAPE '\\'
     ORDER BY name",
  )?;
  let names = stmt
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(names)
}

/// Columns of `table` in definition order. The table name must already be
/// validated; it is quoted here because PRAGMA arguments cannot be bound.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<CatalogColumn>> {
  let mut stmt = conn
    .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
  let columns = stmt
    .query_map([], |row| {
      Ok(CatalogColumn {
        name:      row.get("name")?,
        decl_type: row.get("type")?,
        not_null:  row.get::<_, i64>("notnull")? != 0,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(columns)
}

/// Just the column names of `table`, in definition order.
pub fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
  Ok(table_columns(conn, table)?.into_iter().map(|c| c.name).collect())
}
