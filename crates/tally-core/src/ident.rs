//! Identifier validation for caller-chosen table and column names.
//!
//! Table and column names are runtime strings that end up interpolated into
//! DDL, which cannot be parameterised in standard SQL. Every name is
//! allow-list validated here before it gets anywhere near a statement, and
//! quoted at the interpolation site on top of that.

use crate::{Error, Result};

/// Hard cap on identifier length.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// SQL keywords rejected as identifiers even though they would lex fine.
const RESERVED_WORDS: &[&str] = &[
  "abort", "add", "all", "alter", "and", "as", "asc", "begin", "between",
  "by", "case", "cast", "check", "collate", "column", "commit", "constraint",
  "create", "cross", "current_date", "current_time", "current_timestamp",
  "default", "delete", "desc", "distinct", "drop", "else", "end", "escape",
  "except", "exists", "foreign", "from", "full", "glob", "group", "having",
  "in", "index", "inner", "insert", "intersect", "into", "is", "join", "key",
  "left", "like", "limit", "natural", "not", "null", "offset", "on", "or",
  "order", "outer", "pragma", "primary", "recursive", "references", "regexp",
  "right", "rollback", "rowid", "select", "set", "table", "temp",
  "temporary", "then", "transaction", "trigger", "truncate", "union",
  "unique", "update", "using", "vacuum", "values", "view", "virtual", "when",
  "where", "window", "with",
];

/// Check a caller-supplied table or column name.
///
/// Accepted: a lowercase ASCII letter followed by lowercase letters, digits,
/// and underscores, at most [`MAX_IDENTIFIER_LEN`] characters, and not a SQL
/// reserved word. A leading underscore is rejected; that namespace belongs
/// to the store's own metadata tables.
pub fn validate_identifier(name: &str) -> Result<()> {
  if name.is_empty() {
    return Err(Error::Validation("identifier must not be empty".into()));
  }
  if name.len() > MAX_IDENTIFIER_LEN {
    return Err(Error::Validation(format!(
      "identifier {name:?} exceeds {MAX_IDENTIFIER_LEN} characters"
    )));
  }

  let mut chars = name.chars();
  let first = chars.next().expect("checked non-empty");
  if !first.is_ascii_lowercase() {
    return Err(Error::Validation(format!(
      "identifier {name:?} must start with a lowercase ASCII letter"
    )));
  }
  if let Some(bad) = name
    .chars()
    .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
  {
    return Err(Error::Validation(format!(
      "identifier {name:?} contains invalid character {bad:?}; use lowercase \
       letters, digits, and underscores"
    )));
  }
  if RESERVED_WORDS.contains(&name) {
    return Err(Error::Validation(format!(
      "identifier {name:?} is a reserved SQL word"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_plain_names() {
    for name in ["workouts", "sleep_sessions", "mood2", "a"] {
      assert!(validate_identifier(name).is_ok(), "{name}");
    }
  }

  #[test]
  fn rejects_empty_and_overlong() {
    assert!(validate_identifier("").is_err());
    assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
  }

  #[test]
  fn rejects_leading_underscore_and_digit() {
    assert!(validate_identifier("_table_metadata").is_err());
    assert!(validate_identifier("2fast").is_err());
  }

  #[test]
  fn rejects_uppercase_and_punctuation() {
    assert!(validate_identifier("Workouts").is_err());
    assert!(validate_identifier("drop table").is_err());
    assert!(validate_identifier("a;b").is_err());
    assert!(validate_identifier("a\"b").is_err());
  }

  #[test]
  fn rejects_reserved_words() {
    for name in ["select", "table", "where", "order", "drop"] {
      assert!(validate_identifier(name).is_err(), "{name}");
    }
  }
}
