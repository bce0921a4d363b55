//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, learnings as compact JSON. Scalars map onto SQLite's native
//! storage classes (booleans as 0/1 integers).

use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use tally_core::{column::ColumnType, value::Scalar};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Corrupt(format!("timestamp {s:?}: {e}")))
}

// ─── ColumnType ──────────────────────────────────────────────────────────────

/// The SQL type name used in DDL. SQLite treats these as affinities; the
/// declared names survive in the catalog and round-trip back through
/// [`decode_column_type`].
pub fn encode_column_type(ty: ColumnType) -> &'static str {
  match ty {
    ColumnType::Text => "TEXT",
    ColumnType::Integer => "INTEGER",
    ColumnType::Real => "REAL",
    ColumnType::Boolean => "BOOLEAN",
    ColumnType::Timestamp => "TIMESTAMP",
  }
}

pub fn decode_column_type(decl: &str) -> Result<ColumnType> {
  decl
    .parse::<ColumnType>()
    .map_err(|_| Error::Corrupt(format!("unknown declared type {decl:?}")))
}

// ─── Scalar ──────────────────────────────────────────────────────────────────

pub fn scalar_to_sql(scalar: &Scalar) -> Value {
  match scalar {
    Scalar::Null => Value::Null,
    Scalar::Bool(b) => Value::Integer(i64::from(*b)),
    Scalar::Integer(i) => Value::Integer(*i),
    Scalar::Real(r) => Value::Real(*r),
    Scalar::Text(t) => Value::Text(t.clone()),
  }
}

pub fn scalar_from_sql(value: ValueRef<'_>) -> Scalar {
  match value {
    ValueRef::Null => Scalar::Null,
    ValueRef::Integer(i) => Scalar::Integer(i),
    ValueRef::Real(r) => Scalar::Real(r),
    ValueRef::Text(t) => Scalar::Text(String::from_utf8_lossy(t).into_owned()),
    // Blobs cannot be produced through this layer's insert path; surface
    // them readably rather than erroring a whole result set.
    ValueRef::Blob(b) => Scalar::Text(format!("<blob {} bytes>", b.len())),
  }
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Double-quote an already-validated identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String { format!("\"{name}\"") }
