//! Table metadata and the accumulated "learnings" notes.
//!
//! Learnings are an open-ended key→value map the agent grows over time
//! (observed units, common categorical values, insertion patterns). Updates
//! always merge into the existing map; the map is never replaced wholesale.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cap on the number of learning notes kept per table. When a merge pushes
/// the map past this, the stalest notes (lowest version stamp) are evicted.
pub const MAX_LEARNING_NOTES: usize = 64;

// ─── Learning values ─────────────────────────────────────────────────────────

/// A leaf value in the learnings map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LearningValue {
  Bool(bool),
  Integer(i64),
  Real(f64),
  Text(String),
}

impl From<&str> for LearningValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for LearningValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for LearningValue {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

/// A note plus the learnings version at which it was last written. The
/// version stamp is what makes staleness-based eviction deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningNote {
  pub value:   LearningValue,
  pub version: u32,
}

// ─── Learnings ───────────────────────────────────────────────────────────────

/// The versioned learnings map attached to a table's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Learnings {
  pub version: u32,
  pub notes:   BTreeMap<String, LearningNote>,
}

impl Learnings {
  /// Merge `updates` into the map. Existing keys are overwritten, other
  /// keys are left alone, and the version is bumped once per merge. Over
  /// [`MAX_LEARNING_NOTES`], the lowest-version notes are evicted.
  pub fn merge(
    &mut self,
    updates: impl IntoIterator<Item = (String, LearningValue)>,
  ) {
    self.version += 1;
    for (key, value) in updates {
      self.notes.insert(key, LearningNote {
        value,
        version: self.version,
      });
    }
    while self.notes.len() > MAX_LEARNING_NOTES {
      let stalest = self
        .notes
        .iter()
        .min_by_key(|(key, note)| (note.version, key.as_str().to_owned()))
        .map(|(key, _)| key.clone())
        .expect("non-empty map");
      self.notes.remove(&stalest);
    }
  }
}

// ─── TableMetadata ───────────────────────────────────────────────────────────

/// The satellite record kept for every user table. Created atomically with
/// its table; `updated_at` moves on every insert and schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
  pub table_name:  String,
  pub description: String,
  pub purpose:     String,
  pub learnings:   Learnings,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn note(key: &str, value: &str) -> (String, LearningValue) {
    (key.to_owned(), LearningValue::from(value))
  }

  #[test]
  fn merge_overwrites_and_keeps_unrelated_keys() {
    let mut learnings = Learnings::default();
    learnings.merge([note("units", "lbs"), note("last_insert", "a")]);
    learnings.merge([note("last_insert", "b")]);

    assert_eq!(learnings.version, 2);
    assert_eq!(learnings.notes["units"].value, LearningValue::from("lbs"));
    assert_eq!(learnings.notes["units"].version, 1);
    assert_eq!(learnings.notes["last_insert"].value, LearningValue::from("b"));
    assert_eq!(learnings.notes["last_insert"].version, 2);
  }

  #[test]
  fn eviction_drops_stalest_notes_first() {
    let mut learnings = Learnings::default();
    for i in 0..MAX_LEARNING_NOTES {
      learnings.merge([note(&format!("key_{i:03}"), "x")]);
    }
    assert_eq!(learnings.notes.len(), MAX_LEARNING_NOTES);

    learnings.merge([note("fresh", "y")]);
    assert_eq!(learnings.notes.len(), MAX_LEARNING_NOTES);
    assert!(!learnings.notes.contains_key("key_000"));
    assert!(learnings.notes.contains_key("fresh"));
    assert!(learnings.notes.contains_key("key_001"));
  }

  #[test]
  fn json_round_trip() {
    let mut learnings = Learnings::default();
    learnings.merge([
      ("rows".to_owned(), LearningValue::Integer(6)),
      ("verified".to_owned(), LearningValue::Bool(true)),
    ]);
    let json = serde_json::to_string(&learnings).unwrap();
    let back: Learnings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, learnings);
  }
}
