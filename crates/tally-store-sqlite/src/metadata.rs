//! Reads and writes against the `_table_metadata` and `_column_metadata`
//! satellite tables.
//!
//! These helpers take a plain [`Connection`] so they compose into whatever
//! transaction the caller is running; keeping metadata in the same atomic
//! unit as the schema change it describes is the caller's contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use tally_core::{
  column::{ColumnSpec, ColumnType},
  metadata::{Learnings, LearningValue, TableMetadata},
};

use crate::{
  Error, Result,
  encode::{decode_dt, encode_dt},
};

// ─── Table metadata ──────────────────────────────────────────────────────────

pub fn insert_table_metadata(
  conn: &Connection,
  table: &str,
  description: &str,
  purpose: &str,
  now: DateTime<Utc>,
) -> Result<()> {
  let now_str = encode_dt(now);
  conn.execute(
    "INSERT INTO _table_metadata
       (table_name, description, purpose, learnings, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    params![
      table,
      description,
      purpose,
      serde_json::to_string(&Learnings::default())?,
      now_str,
    ],
  )?;
  Ok(())
}

pub fn table_metadata(
  conn: &Connection,
  table: &str,
) -> Result<Option<TableMetadata>> {
  let row: Option<(String, String, String, String, String)> = conn
    .query_row(
      "SELECT description, purpose, learnings, created_at, updated_at
       FROM _table_metadata WHERE table_name = ?1",
      [table],
      |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
      },
    )
    .optional()?;

  let Some((description, purpose, learnings_json, created_at, updated_at)) =
    row
  else {
    return Ok(None);
  };

  Ok(Some(TableMetadata {
    table_name:  table.to_owned(),
    description,
    purpose,
    learnings:   serde_json::from_str(&learnings_json)
      .map_err(|e| Error::Corrupt(format!("learnings for {table:?}: {e}")))?,
    created_at:  decode_dt(&created_at)?,
    updated_at:  decode_dt(&updated_at)?,
  }))
}

/// Merge `updates` into the table's learnings and advance `updated_at`.
/// Read-modify-write of the JSON blob; prior notes survive the merge.
pub fn merge_learnings(
  conn: &Connection,
  table: &str,
  updates: Vec<(String, LearningValue)>,
  now: DateTime<Utc>,
) -> Result<()> {
  let learnings_json: String = conn.query_row(
    "SELECT learnings FROM _table_metadata WHERE table_name = ?1",
    [table],
    |row| row.get(0),
  )?;
  let mut learnings: Learnings = serde_json::from_str(&learnings_json)
    .map_err(|e| Error::Corrupt(format!("learnings for {table:?}: {e}")))?;

  learnings.merge(updates);

  conn.execute(
    "UPDATE _table_metadata SET learnings = ?2, updated_at = ?3
     WHERE table_name = ?1",
    params![table, serde_json::to_string(&learnings)?, encode_dt(now)],
  )?;
  Ok(())
}

// ─── Column metadata ─────────────────────────────────────────────────────────

/// Metadata recorded for one caller column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
  pub description: String,
  pub data_type:   String,
  pub unit:        Option<String>,
}

/// Upsert a column's metadata row, matching the add-column semantics: a
/// re-added description wins over a stale one.
pub fn upsert_column_metadata(
  conn: &Connection,
  table: &str,
  spec: &ColumnSpec,
) -> Result<()> {
  conn.execute(
    "INSERT INTO _column_metadata
       (table_name, column_name, description, data_type, unit)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (table_name, column_name) DO UPDATE SET
       description = excluded.description,
       data_type   = excluded.data_type,
       unit        = excluded.unit",
    params![
      table,
      spec.name,
      spec.description,
      spec.column_type.as_str(),
      spec.unit,
    ],
  )?;
  Ok(())
}

pub fn column_metadata(
  conn: &Connection,
  table: &str,
) -> Result<BTreeMap<String, ColumnMeta>> {
  let mut stmt = conn.prepare(
    "SELECT column_name, description, data_type, unit
     FROM _column_metadata WHERE table_name = ?1",
  )?;
  let rows = stmt
    .query_map([table], |row| {
      Ok((row.get::<_, String>(0)?, ColumnMeta {
        description: row.get(1)?,
        data_type:   row.get(2)?,
        unit:        row.get(3)?,
      }))
    })?
    .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
  Ok(rows)
}

pub fn rename_column_metadata(
  conn: &Connection,
  table: &str,
  old: &str,
  new: &str,
) -> Result<()> {
  conn.execute(
    "UPDATE _column_metadata SET column_name = ?3
     WHERE table_name = ?1 AND column_name = ?2",
    params![table, old, new],
  )?;
  Ok(())
}

pub fn retype_column_metadata(
  conn: &Connection,
  table: &str,
  column: &str,
  new_type: ColumnType,
) -> Result<()> {
  conn.execute(
    "UPDATE _column_metadata SET data_type = ?3
     WHERE table_name = ?1 AND column_name = ?2",
    params![table, column, new_type.as_str()],
  )?;
  Ok(())
}

pub fn delete_column_metadata(
  conn: &Connection,
  table: &str,
  column: &str,
) -> Result<()> {
  conn.execute(
    "DELETE FROM _column_metadata
     WHERE table_name = ?1 AND column_name = ?2",
    params![table, column],
  )?;
  Ok(())
}
