//! Read-only guard for the query path.
//!
//! The statement is lexed — comments, string literals, and quoted
//! identifiers are skipped — and the remaining bare words are checked:
//! the statement must be a single top-level `SELECT` (or `WITH … SELECT`),
//! and no mutating keyword may appear as a standalone token. Statements
//! failing either check never reach the database. After preparation the
//! store additionally asserts `sqlite3_stmt_readonly` as a backstop.

use tally_core::Error;

/// Keywords that always mark a statement as mutating.
const MUTATING_KEYWORDS: [&str; 7] =
  ["CREATE", "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE"];

/// Reject `sql` unless it lexes as a single read-only SELECT statement.
pub fn ensure_read_only(sql: &str) -> Result<(), Error> {
  let words = lex_bare_words(sql)?;

  let Some(first) = words.first() else {
    return Err(Error::QueryExecution("empty statement".into()));
  };
  if first != "SELECT" && first != "WITH" {
    return Err(Error::ForbiddenOperation(format!(
      "only SELECT statements are allowed, got {first}"
    )));
  }
  for word in &words {
    if MUTATING_KEYWORDS.contains(&word.as_str()) {
      return Err(Error::ForbiddenOperation(format!(
        "{word} is not allowed in the query path"
      )));
    }
  }
  Ok(())
}

/// Uppercased bare words of the first statement. Errors if a second
/// statement follows the first semicolon.
fn lex_bare_words(sql: &str) -> Result<Vec<String>, Error> {
  let mut words = Vec::new();
  let mut chars = sql.char_indices().peekable();
  let bytes = sql.as_bytes();
  let mut terminated = false;

  while let Some((i, c)) = chars.next() {
    if terminated && !c.is_whitespace() {
      return Err(Error::ForbiddenOperation(
        "multiple SQL statements are not allowed".into(),
      ));
    }
    match c {
      ';' => terminated = true,
      // Line comment.
      '-' if bytes.get(i + 1) == Some(&b'-') => {
        for (_, n) in chars.by_ref() {
          if n == '\n' {
            break;
          }
        }
      }
      // Block comment.
      '/' if bytes.get(i + 1) == Some(&b'*') => {
        chars.next();
        let mut prev = ' ';
        for (_, n) in chars.by_ref() {
          if prev == '*' && n == '/' {
            break;
          }
          prev = n;
        }
      }
      // String literal; '' escapes a quote.
      '\'' => skip_quoted(&mut chars, '\''),
      // Quoted identifier (double quotes or brackets/backticks).
      '"' => skip_quoted(&mut chars, '"'),
      '`' => skip_quoted(&mut chars, '`'),
      '[' => {
        for (_, n) in chars.by_ref() {
          if n == ']' {
            break;
          }
        }
      }
      _ if c.is_ascii_alphabetic() || c == '_' => {
        let mut word = String::new();
        word.push(c.to_ascii_uppercase());
        while let Some((_, n)) = chars.peek() {
          if n.is_ascii_alphanumeric() || *n == '_' {
            word.push(n.to_ascii_uppercase());
            chars.next();
          } else {
            break;
          }
        }
        words.push(word);
      }
      _ => {}
    }
  }
  Ok(words)
}

fn skip_quoted(
  chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
  quote: char,
) {
  while let Some((_, n)) = chars.next() {
    if n == quote {
      // A doubled quote is an escape, not a terminator.
      if chars.peek().map(|(_, p)| *p) == Some(quote) {
        chars.next();
        continue;
      }
      break;
    }
  }
}
