//! SQL schema for the metadata tables.
//!
//! Executed once at connection startup. The leading-underscore namespace is
//! reserved for these tables; identifier validation rejects it for callers,
//! so user tables can never collide with them.

/// Metadata DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One satellite record per user table. Created in the same transaction as
-- the table itself.
CREATE TABLE IF NOT EXISTS _table_metadata (
    table_name  TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    purpose     TEXT NOT NULL DEFAULT '',
    learnings   TEXT NOT NULL DEFAULT '{\"version\":0,\"notes\":{}}',
    created_at  TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    updated_at  TEXT NOT NULL
);

-- One record per (table, caller column). Invariant columns are not listed.
-- Kept in step with the live schema inside every schema-change transaction.
CREATE TABLE IF NOT EXISTS _column_metadata (
    table_name  TEXT NOT NULL REFERENCES _table_metadata(table_name)
                ON DELETE CASCADE,
    column_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    data_type   TEXT NOT NULL,   -- declared tool type, lowercase
    unit        TEXT,
    PRIMARY KEY (table_name, column_name)
);

PRAGMA user_version = 1;
";
