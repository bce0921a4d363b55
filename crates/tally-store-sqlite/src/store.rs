//! [`SqliteStore`] — the SQLite implementation of [`LogStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params_from_iter};
use tally_core::{
  Error as CoreError,
  metadata::LearningValue,
  mutation::{SchemaChange, SchemaOp},
  store::LogStore,
  table::{
    CREATED_AT_COLUMN, DATE_COLUMN, ID_COLUMN, NewTable, RECENT_ROW_LIMIT,
    TableDetail, TableSummary, is_protected_field,
  },
  value::{QueryOutput, Row, Scalar},
};
use uuid::Uuid;

use crate::{
  Error, Result, catalog,
  encode::{
    decode_column_type, decode_dt, encode_dt, encode_uuid, quote_ident,
    scalar_from_sql, scalar_to_sql,
  },
  guard, metadata, mutate,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally logging store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// callers share one connection; SQLite's own transaction serialisation is
/// the only cross-process coordination, as documented in DESIGN.md.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LogStore impl ───────────────────────────────────────────────────────────

impl LogStore for SqliteStore {
  type Error = Error;

  async fn list_tables(&self) -> Result<Vec<TableSummary>> {
    self.conn.call(|conn| Ok(list_overview(conn))).await?
  }

  async fn describe_table(&self, table: &str) -> Result<TableDetail> {
    let table = table.to_owned();
    self
      .conn
      .call(move |conn| Ok(read_detail(conn, &table)))
      .await?
  }

  async fn create_table(&self, spec: NewTable) -> Result<TableDetail> {
    spec.validate().map_err(Error::Core)?;
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(create_table_tx(conn, &spec, now)))
      .await?
  }

  async fn edit_schema(
    &self,
    table: &str,
    ops: Vec<SchemaOp>,
  ) -> Result<SchemaChange> {
    if ops.is_empty() {
      return Err(
        CoreError::Validation("operations must not be empty".into()).into(),
      );
    }
    for op in &ops {
      op.validate().map_err(Error::Core)?;
    }

    let table = table.to_owned();
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(edit_schema_tx(conn, &table, &ops, now)))
      .await?
  }

  async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Uuid>> {
    if rows.is_empty() {
      return Err(
        CoreError::Validation("no records to insert".into()).into(),
      );
    }

    let table_owned = table.to_owned();
    let now = Utc::now();
    let (ids, learnings) = self
      .conn
      .call(move |conn| Ok(insert_rows_tx(conn, &table_owned, &rows, now)))
      .await??;

    // The learnings update is best-effort: the rows are already committed,
    // so a failure here must not fail the insert.
    let table_owned = table.to_owned();
    let outcome = self
      .conn
      .call(move |conn| {
        Ok(metadata::merge_learnings(conn, &table_owned, learnings, now))
      })
      .await;
    if let Err(e) = outcome.map_err(Error::from).and_then(|inner| inner) {
      tracing::warn!(
        table,
        error = %e,
        "learnings update failed after committed insert"
      );
    }

    Ok(ids)
  }

  async fn query(&self, sql: &str) -> Result<QueryOutput> {
    guard::ensure_read_only(sql).map_err(Error::Core)?;
    let sql = sql.to_owned();
    self.conn.call(move |conn| Ok(run_query(conn, &sql))).await?
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

fn list_overview(conn: &Connection) -> Result<Vec<TableSummary>> {
  let mut summaries = Vec::new();
  for name in catalog::user_tables(conn)? {
    let meta = metadata::table_metadata(conn, &name)?;
    let column_count = catalog::table_columns(conn, &name)?.len();
    let (description, purpose) = meta
      .map(|m| (m.description, m.purpose))
      .unwrap_or_default();
    summaries.push(TableSummary { name, description, purpose, column_count });
  }
  Ok(summaries)
}

fn read_detail(conn: &Connection, table: &str) -> Result<TableDetail> {
  if !catalog::table_exists(conn, table)? {
    return Err(CoreError::TableNotFound(table.to_owned()).into());
  }

  let meta = metadata::table_metadata(conn, table)?;
  let column_meta = metadata::column_metadata(conn, table)?;

  let columns = catalog::table_columns(conn, table)?
    .into_iter()
    .map(|col| {
      let recorded = column_meta.get(&col.name);
      Ok(tally_core::column::ColumnInfo {
        column_type: decode_column_type(&col.decl_type)?,
        description: recorded.map(|m| m.description.clone()),
        unit:        recorded.and_then(|m| m.unit.clone()),
        name:        col.name,
      })
    })
    .collect::<Result<Vec<_>>>()?;

  let recent = recent_rows(conn, table)?;
  let (description, purpose) = meta
    .map(|m| (m.description, m.purpose))
    .unwrap_or_default();

  Ok(TableDetail {
    name: table.to_owned(),
    description,
    purpose,
    columns,
    recent,
  })
}

/// The most recent rows by `created_at`, newest first.
fn recent_rows(conn: &Connection, table: &str) -> Result<Vec<Row>> {
  let sql = format!(
    "SELECT * FROM {} ORDER BY {} DESC LIMIT {}",
    quote_ident(table),
    quote_ident(CREATED_AT_COLUMN),
    RECENT_ROW_LIMIT
  );
  let mut stmt = conn.prepare(&sql)?;
  let names: Vec<String> =
    stmt.column_names().iter().map(|s| s.to_string()).collect();

  let mut rows = stmt.query([])?;
  let mut out = Vec::new();
  while let Some(row) = rows.next()? {
    let mut record = Row::new();
    for (i, name) in names.iter().enumerate() {
      record.insert(name.clone(), scalar_from_sql(row.get_ref(i)?));
    }
    out.push(record);
  }
  Ok(out)
}

// ─── Table creation ──────────────────────────────────────────────────────────

fn create_table_tx(
  conn: &mut Connection,
  spec: &NewTable,
  now: DateTime<Utc>,
) -> Result<TableDetail> {
  if catalog::table_exists(conn, &spec.name)? {
    return Err(CoreError::TableExists(spec.name.clone()).into());
  }

  let tx = conn.transaction()?;
  tx.execute_batch(&mutate::table_ddl(&spec.name, &spec.columns))?;
  metadata::insert_table_metadata(
    &tx,
    &spec.name,
    &spec.description,
    &spec.purpose,
    now,
  )?;
  for col in &spec.columns {
    metadata::upsert_column_metadata(&tx, &spec.name, col)?;
  }
  tx.commit()?;

  read_detail(conn, &spec.name)
}

// ─── Schema edits ────────────────────────────────────────────────────────────

fn edit_schema_tx(
  conn: &mut Connection,
  table: &str,
  ops: &[SchemaOp],
  now: DateTime<Utc>,
) -> Result<SchemaChange> {
  if !catalog::table_exists(conn, table)? {
    return Err(CoreError::TableNotFound(table.to_owned()).into());
  }

  let tx = conn.transaction()?;
  let mut applied = Vec::with_capacity(ops.len());
  for op in ops {
    applied.push(mutate::apply_op(&tx, table, op)?);
  }
  // Schema-change bookkeeping rides in the same atomic unit as the change.
  metadata::merge_learnings(
    &tx,
    table,
    vec![(
      "last_schema_change".to_owned(),
      LearningValue::Text(applied.join("; ")),
    )],
    now,
  )?;
  tx.commit()?;

  Ok(SchemaChange { table: table.to_owned(), applied })
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

type LearningUpdates = Vec<(String, LearningValue)>;

fn insert_rows_tx(
  conn: &mut Connection,
  table: &str,
  rows: &[Row],
  now: DateTime<Utc>,
) -> Result<(Vec<Uuid>, LearningUpdates)> {
  if !catalog::table_exists(conn, table)? {
    return Err(CoreError::TableNotFound(table.to_owned()).into());
  }
  let columns = catalog::column_names(conn, table)?;

  // created_at is store-assigned and non-decreasing per table, even if the
  // wall clock steps backwards between batches.
  let created_at = next_created_at(conn, table, now)?;
  let created_at_str = encode_dt(created_at);

  let tx = conn.transaction()?;
  let mut ids = Vec::with_capacity(rows.len());
  for row in rows {
    for key in row.keys() {
      if is_protected_field(key) {
        return Err(CoreError::ProtectedField(key.clone()).into());
      }
      if !columns.contains(key) {
        return Err(
          CoreError::UnknownColumn {
            table:  table.to_owned(),
            column: key.clone(),
          }
          .into(),
        );
      }
    }
    match row.get(DATE_COLUMN) {
      None | Some(Scalar::Null) => {
        return Err(
          CoreError::Validation(format!(
            "every record must include a {DATE_COLUMN:?} value"
          ))
          .into(),
        );
      }
      Some(_) => {}
    }

    let id = Uuid::new_v4();
    let mut insert_columns = vec![ID_COLUMN.to_owned()];
    let mut values = vec![rusqlite::types::Value::Text(encode_uuid(id))];
    for (key, value) in row {
      insert_columns.push(key.clone());
      values.push(scalar_to_sql(value));
    }
    insert_columns.push(CREATED_AT_COLUMN.to_owned());
    values.push(rusqlite::types::Value::Text(created_at_str.clone()));

    let placeholders: Vec<String> =
      (1..=values.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({})",
      quote_ident(table),
      insert_columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", "),
      placeholders.join(", ")
    );
    tx.execute(&sql, params_from_iter(values))?;
    ids.push(id);
  }
  tx.commit()?;

  Ok((ids, insert_learnings(rows, now)))
}

/// A `created_at` no earlier than any already stored for `table`.
fn next_created_at(
  conn: &Connection,
  table: &str,
  now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
  let max: Option<String> = conn
    .query_row(
      &format!(
        "SELECT MAX({}) FROM {}",
        quote_ident(CREATED_AT_COLUMN),
        quote_ident(table)
      ),
      [],
      |row| row.get(0),
    )
    .optional()?
    .flatten();
  match max {
    Some(s) => Ok(decode_dt(&s)?.max(now)),
    None => Ok(now),
  }
}

/// The insertion-pattern notes merged into the table's learnings after a
/// successful batch.
fn insert_learnings(rows: &[Row], now: DateTime<Utc>) -> LearningUpdates {
  let mut used: Vec<&str> = Vec::new();
  for row in rows {
    for key in row.keys() {
      if !used.contains(&key.as_str()) {
        used.push(key);
      }
    }
  }

  let last = rows.last().expect("batch is non-empty");
  let mut summary = last
    .iter()
    .map(|(k, v)| format!("{k}={v} ({})", v.type_name()))
    .collect::<Vec<_>>()
    .join(", ");
  const SUMMARY_CAP: usize = 200;
  if summary.len() > SUMMARY_CAP {
    let mut end = SUMMARY_CAP;
    while !summary.is_char_boundary(end) {
      end -= 1;
    }
    summary.truncate(end);
    summary.push('…');
  }

  vec![
    ("recent_columns_used".to_owned(), LearningValue::Text(used.join(", "))),
    ("last_insert_rows".to_owned(), LearningValue::Integer(rows.len() as i64)),
    ("last_insert_summary".to_owned(), LearningValue::Text(summary)),
    ("last_insert_at".to_owned(), LearningValue::Text(encode_dt(now))),
  ]
}

// ─── Queries ─────────────────────────────────────────────────────────────────

fn run_query(conn: &Connection, sql: &str) -> Result<QueryOutput> {
  let mut stmt = conn.prepare(sql).map_err(query_err)?;

  // Backstop behind the lexical guard: SQLite itself knows whether the
  // prepared statement can write.
  if !stmt.readonly() {
    return Err(
      CoreError::ForbiddenOperation(
        "statement is not read-only".into(),
      )
      .into(),
    );
  }

  let columns: Vec<String> =
    stmt.column_names().iter().map(|s| s.to_string()).collect();
  let width = columns.len();

  let mut rows = stmt.query([]).map_err(query_err)?;
  let mut out = Vec::new();
  while let Some(row) = rows.next().map_err(query_err)? {
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
      values.push(scalar_from_sql(row.get_ref(i).map_err(query_err)?));
    }
    out.push(values);
  }

  Ok(QueryOutput { columns, rows: out })
}

fn query_err(e: rusqlite::Error) -> Error {
  Error::Core(CoreError::QueryExecution(e.to_string()))
}
