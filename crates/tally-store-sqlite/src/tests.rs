//! Integration tests for `SqliteStore` against an in-memory database.

use tally_core::{
  Error as CoreError,
  column::{ColumnSpec, ColumnType},
  metadata::Learnings,
  mutation::SchemaOp,
  store::LogStore,
  table::NewTable,
  value::{Row, Scalar},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn col(name: &str, ty: ColumnType) -> ColumnSpec {
  ColumnSpec {
    name:        name.into(),
    column_type: ty,
    description: format!("{name} description"),
    unit:        None,
    required:    false,
  }
}

fn workouts() -> NewTable {
  let mut weight = col("weight", ColumnType::Real);
  weight.unit = Some("lbs".into());
  NewTable {
    name:        "workouts".into(),
    description: "strength training sessions".into(),
    purpose:     "track lifting progress".into(),
    columns:     vec![col("exercise", ColumnType::Text), weight],
  }
}

fn row(pairs: &[(&str, Scalar)]) -> Row {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), v.clone()))
    .collect()
}

fn date() -> (&'static str, Scalar) {
  ("date", Scalar::Text("2023-06-08T10:30:00Z".into()))
}

// ─── Table creation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_table_orders_columns_and_records_metadata() {
  let s = store().await;
  let detail = s.create_table(workouts()).await.unwrap();

  let names: Vec<&str> =
    detail.columns.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, ["id", "date", "exercise", "weight", "created_at"]);

  // Caller columns carry their metadata; invariant columns carry none.
  let weight = &detail.columns[3];
  assert_eq!(weight.column_type, ColumnType::Real);
  assert_eq!(weight.description.as_deref(), Some("weight description"));
  assert_eq!(weight.unit.as_deref(), Some("lbs"));
  assert!(detail.columns[0].description.is_none());

  assert_eq!(detail.description, "strength training sessions");
  assert_eq!(detail.purpose, "track lifting progress");
  assert!(detail.recent.is_empty());

  // Exactly one metadata row per caller column.
  let out = s
    .query(
      "SELECT column_name FROM _column_metadata \
       WHERE table_name = 'workouts' ORDER BY column_name",
    )
    .await
    .unwrap();
  let recorded: Vec<Scalar> =
    out.rows.into_iter().map(|mut r| r.remove(0)).collect();
  assert_eq!(recorded, [
    Scalar::Text("exercise".into()),
    Scalar::Text("weight".into()),
  ]);
}

#[tokio::test]
async fn create_table_duplicate_name_leaves_prior_table_untouched() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  let before = s.describe_table("workouts").await.unwrap();

  let mut other = workouts();
  other.columns = vec![col("calories", ColumnType::Integer)];
  let err = s.create_table(other).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TableExists(_))));

  let after = s.describe_table("workouts").await.unwrap();
  assert_eq!(
    serde_json::to_value(&before).unwrap(),
    serde_json::to_value(&after).unwrap()
  );
}

#[tokio::test]
async fn create_table_rejects_malformed_specs() {
  let s = store().await;

  let mut empty = workouts();
  empty.columns.clear();
  assert!(matches!(
    s.create_table(empty).await.unwrap_err(),
    Error::Core(CoreError::Validation(_))
  ));

  let mut duped = workouts();
  duped.columns.push(col("exercise", ColumnType::Text));
  assert!(matches!(
    s.create_table(duped).await.unwrap_err(),
    Error::Core(CoreError::Validation(_))
  ));

  let mut reserved = workouts();
  reserved.name = "select".into();
  assert!(matches!(
    s.create_table(reserved).await.unwrap_err(),
    Error::Core(CoreError::Validation(_))
  ));

  let mut shadowing = workouts();
  shadowing.columns.push(col("created_at", ColumnType::Text));
  assert!(matches!(
    s.create_table(shadowing).await.unwrap_err(),
    Error::Core(CoreError::Validation(_))
  ));
}

// ─── Catalog reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn list_tables_overview() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let sleep = NewTable {
    name:        "sleep".into(),
    description: "nightly sleep".into(),
    purpose:     String::new(),
    columns:     vec![col("hours", ColumnType::Real)],
  };
  s.create_table(sleep).await.unwrap();

  let tables = s.list_tables().await.unwrap();
  assert_eq!(tables.len(), 2);

  let sleep = tables.iter().find(|t| t.name == "sleep").unwrap();
  assert_eq!(sleep.description, "nightly sleep");
  assert_eq!(sleep.column_count, 4); // id, date, hours, created_at

  let workouts = tables.iter().find(|t| t.name == "workouts").unwrap();
  assert_eq!(workouts.column_count, 5);
}

#[tokio::test]
async fn metadata_tables_do_not_appear_in_overview() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  let names: Vec<String> =
    s.list_tables().await.unwrap().into_iter().map(|t| t.name).collect();
  assert_eq!(names, ["workouts"]);
}

#[tokio::test]
async fn describe_missing_table_errors() {
  let s = store().await;
  let err = s.describe_table("nope").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TableNotFound(_))));
}

#[tokio::test]
async fn describe_includes_recent_rows_newest_first() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  for name in ["a", "b", "c", "d"] {
    s.insert_rows(
      "workouts",
      vec![row(&[date(), ("exercise", Scalar::Text(name.into()))])],
    )
    .await
    .unwrap();
  }

  let detail = s.describe_table("workouts").await.unwrap();
  assert_eq!(detail.recent.len(), 3);
  for record in &detail.recent {
    assert!(record.contains_key("id"));
    assert!(record.contains_key("created_at"));
  }
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_returns_generated_ids_in_input_order() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let ids = s
    .insert_rows("workouts", vec![
      row(&[date(), ("exercise", Scalar::Text("squat".into()))]),
      row(&[date(), ("exercise", Scalar::Text("bench".into()))]),
      row(&[date(), ("exercise", Scalar::Text("row".into()))]),
    ])
    .await
    .unwrap();
  assert_eq!(ids.len(), 3);

  let out = s
    .query("SELECT id, exercise FROM workouts")
    .await
    .unwrap();
  let by_exercise: std::collections::BTreeMap<String, String> = out
    .rows
    .iter()
    .map(|r| match (&r[1], &r[0]) {
      (Scalar::Text(ex), Scalar::Text(id)) => (ex.clone(), id.clone()),
      other => panic!("unexpected row {other:?}"),
    })
    .collect();
  assert_eq!(by_exercise["squat"], ids[0].hyphenated().to_string());
  assert_eq!(by_exercise["bench"], ids[1].hyphenated().to_string());
  assert_eq!(by_exercise["row"], ids[2].hyphenated().to_string());
}

#[tokio::test]
async fn insert_requires_date() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let err = s
    .insert_rows("workouts", vec![row(&[(
      "exercise",
      Scalar::Text("squat".into()),
    )])])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn insert_rejects_protected_fields_and_writes_nothing() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  for field in ["id", "created_at"] {
    let err = s
      .insert_rows("workouts", vec![row(&[
        date(),
        (field, Scalar::Text("sneaky".into())),
      ])])
      .await
      .unwrap_err();
    assert!(
      matches!(err, Error::Core(CoreError::ProtectedField(ref f)) if f == field),
      "{field}"
    );
  }

  let out = s.query("SELECT count(*) FROM workouts").await.unwrap();
  assert_eq!(out.rows[0][0], Scalar::Integer(0));
}

#[tokio::test]
async fn insert_batch_is_atomic_when_one_row_is_bad() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let mut batch: Vec<Row> = (0..6)
    .map(|i| {
      row(&[date(), ("exercise", Scalar::Text(format!("lift {i}")))])
    })
    .collect();
  batch[3].insert("rpe".into(), Scalar::Integer(8));

  let err = s.insert_rows("workouts", batch).await.unwrap_err();
  assert!(
    matches!(err, Error::Core(CoreError::UnknownColumn { ref column, .. }) if column == "rpe")
  );

  let out = s.query("SELECT count(*) FROM workouts").await.unwrap();
  assert_eq!(out.rows[0][0], Scalar::Integer(0));
}

#[tokio::test]
async fn insert_unknown_column_names_the_offender() {
  let s = store().await;
  let table = NewTable {
    name:        "workouts".into(),
    description: "sessions".into(),
    purpose:     String::new(),
    columns:     vec![col("rpe", ColumnType::Integer)],
  };
  s.create_table(table).await.unwrap();

  let err = s
    .insert_rows("workouts", vec![row(&[
      ("date", Scalar::Text("2023-06-09T00:00:00Z".into())),
      ("exercise", Scalar::Text("squat".into())),
      ("rpe", Scalar::Integer(8)),
    ])])
    .await
    .unwrap_err();
  assert!(
    matches!(err, Error::Core(CoreError::UnknownColumn { ref column, .. }) if column == "exercise")
  );
}

#[tokio::test]
async fn insert_rows_may_use_different_columns() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  s.insert_rows("workouts", vec![
    row(&[date(), ("exercise", Scalar::Text("squat".into()))]),
    row(&[date(), ("weight", Scalar::Real(95.0))]),
  ])
  .await
  .unwrap();

  let out = s
    .query("SELECT exercise, weight FROM workouts ORDER BY exercise IS NULL")
    .await
    .unwrap();
  assert_eq!(out.rows.len(), 2);
  // Columns absent from a record are left NULL.
  assert_eq!(out.rows[0][1], Scalar::Null);
  assert_eq!(out.rows[1][0], Scalar::Null);
}

#[tokio::test]
async fn insert_into_missing_table_errors() {
  let s = store().await;
  let err = s
    .insert_rows("nope", vec![row(&[date()])])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TableNotFound(_))));
}

#[tokio::test]
async fn created_at_is_non_decreasing() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  for _ in 0..3 {
    s.insert_rows(
      "workouts",
      vec![row(&[date(), ("exercise", Scalar::Text("squat".into()))])],
    )
    .await
    .unwrap();
  }

  let out = s
    .query("SELECT created_at FROM workouts ORDER BY rowid")
    .await
    .unwrap();
  let stamps: Vec<String> = out
    .rows
    .iter()
    .map(|r| match &r[0] {
      Scalar::Text(t) => t.clone(),
      other => panic!("unexpected created_at {other:?}"),
    })
    .collect();
  let mut sorted = stamps.clone();
  sorted.sort();
  assert_eq!(stamps, sorted);
}

#[tokio::test]
async fn insert_merges_learnings() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  s.insert_rows("workouts", vec![row(&[
    date(),
    ("exercise", Scalar::Text("deadlift".into())),
    ("weight", Scalar::Real(185.0)),
  ])])
  .await
  .unwrap();

  let out = s
    .query(
      "SELECT learnings FROM _table_metadata WHERE table_name = 'workouts'",
    )
    .await
    .unwrap();
  let Scalar::Text(json) = &out.rows[0][0] else {
    panic!("learnings must be text")
  };
  let learnings: Learnings = serde_json::from_str(json).unwrap();
  assert!(learnings.version >= 1);
  assert!(learnings.notes.contains_key("recent_columns_used"));
  assert!(learnings.notes.contains_key("last_insert_summary"));
}

// ─── Schema edits ────────────────────────────────────────────────────────────

#[tokio::test]
async fn edit_schema_add_column_then_insert() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let change = s
    .edit_schema("workouts", vec![SchemaOp::AddColumn {
      column: col("rpe", ColumnType::Integer),
    }])
    .await
    .unwrap();
  assert_eq!(change.applied.len(), 1);

  s.insert_rows("workouts", vec![row(&[
    date(),
    ("exercise", Scalar::Text("squat".into())),
    ("rpe", Scalar::Integer(8)),
  ])])
  .await
  .unwrap();

  let detail = s.describe_table("workouts").await.unwrap();
  let rpe = detail.columns.iter().find(|c| c.name == "rpe").unwrap();
  assert_eq!(rpe.column_type, ColumnType::Integer);
  assert_eq!(rpe.description.as_deref(), Some("rpe description"));
}

#[tokio::test]
async fn edit_schema_add_existing_column_errors() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let err = s
    .edit_schema("workouts", vec![SchemaOp::AddColumn {
      column: col("exercise", ColumnType::Text),
    }])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ColumnExists { .. })));
}

#[tokio::test]
async fn edit_schema_rename_keeps_metadata_and_data() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  s.insert_rows("workouts", vec![row(&[
    date(),
    ("weight", Scalar::Real(185.0)),
  ])])
  .await
  .unwrap();

  s.edit_schema("workouts", vec![SchemaOp::RenameColumn {
    name:     "weight".into(),
    new_name: "weight_lbs".into(),
  }])
  .await
  .unwrap();

  let detail = s.describe_table("workouts").await.unwrap();
  assert!(detail.columns.iter().all(|c| c.name != "weight"));
  let renamed =
    detail.columns.iter().find(|c| c.name == "weight_lbs").unwrap();
  assert_eq!(renamed.unit.as_deref(), Some("lbs"));
  assert_eq!(renamed.description.as_deref(), Some("weight description"));

  let out = s.query("SELECT weight_lbs FROM workouts").await.unwrap();
  assert_eq!(out.rows[0][0], Scalar::Real(185.0));
}

#[tokio::test]
async fn edit_schema_retype_changes_declared_type_and_casts_data() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  s.insert_rows("workouts", vec![row(&[
    date(),
    ("weight", Scalar::Real(185.0)),
  ])])
  .await
  .unwrap();

  s.edit_schema("workouts", vec![SchemaOp::RetypeColumn {
    name:     "weight".into(),
    new_type: ColumnType::Integer,
  }])
  .await
  .unwrap();

  let detail = s.describe_table("workouts").await.unwrap();
  let weight = detail.columns.iter().find(|c| c.name == "weight").unwrap();
  assert_eq!(weight.column_type, ColumnType::Integer);

  // Column order survives the rebuild.
  let names: Vec<&str> =
    detail.columns.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, ["id", "date", "exercise", "weight", "created_at"]);

  let out = s.query("SELECT weight FROM workouts").await.unwrap();
  assert_eq!(out.rows[0][0], Scalar::Integer(185));
}

#[tokio::test]
async fn edit_schema_drop_column_removes_metadata() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  s.edit_schema("workouts", vec![SchemaOp::DropColumn {
    name: "weight".into(),
  }])
  .await
  .unwrap();

  let detail = s.describe_table("workouts").await.unwrap();
  assert!(detail.columns.iter().all(|c| c.name != "weight"));

  let out = s
    .query(
      "SELECT count(*) FROM _column_metadata \
       WHERE table_name = 'workouts' AND column_name = 'weight'",
    )
    .await
    .unwrap();
  assert_eq!(out.rows[0][0], Scalar::Integer(0));
}

#[tokio::test]
async fn edit_schema_batch_rolls_back_on_late_failure() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let err = s
    .edit_schema("workouts", vec![
      SchemaOp::AddColumn { column: col("rpe", ColumnType::Integer) },
      SchemaOp::DropColumn { name: "no_such_column".into() },
    ])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ColumnNotFound { .. })));

  // The first operation's effect is rolled back too.
  let detail = s.describe_table("workouts").await.unwrap();
  assert!(detail.columns.iter().all(|c| c.name != "rpe"));
  let out = s
    .query(
      "SELECT count(*) FROM _column_metadata \
       WHERE table_name = 'workouts' AND column_name = 'rpe'",
    )
    .await
    .unwrap();
  assert_eq!(out.rows[0][0], Scalar::Integer(0));
}

#[tokio::test]
async fn edit_schema_protects_invariant_columns() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  for name in ["id", "date", "created_at"] {
    let err = s
      .edit_schema("workouts", vec![SchemaOp::DropColumn {
        name: name.into(),
      }])
      .await
      .unwrap_err();
    assert!(
      matches!(err, Error::Core(CoreError::ProtectedField(_))),
      "{name}"
    );
  }
}

#[tokio::test]
async fn edit_schema_missing_table_errors() {
  let s = store().await;
  let err = s
    .edit_schema("nope", vec![SchemaOp::DropColumn { name: "x".into() }])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TableNotFound(_))));
}

#[tokio::test]
async fn edit_schema_rejects_empty_operations() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  let err = s.edit_schema("workouts", vec![]).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_round_trip() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  s.insert_rows("workouts", vec![row(&[
    ("date", Scalar::Text("2023-06-08T10:30".into())),
    ("exercise", Scalar::Text("deadlift".into())),
    ("weight", Scalar::Real(185.0)),
  ])])
  .await
  .unwrap();

  let out = s
    .query("SELECT exercise, weight FROM workouts")
    .await
    .unwrap();
  assert_eq!(out.columns, ["exercise", "weight"]);
  assert_eq!(out.rows, [vec![
    Scalar::Text("deadlift".into()),
    Scalar::Real(185.0),
  ]]);
}

#[tokio::test]
async fn query_rejects_drop_in_any_case_without_touching_state() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  for sql in [
    "DROP TABLE workouts",
    "drop table workouts",
    "SELECT 1; dRoP TABLE workouts",
  ] {
    let err = s.query(sql).await.unwrap_err();
    assert!(
      matches!(err, Error::Core(CoreError::ForbiddenOperation(_))),
      "{sql}"
    );
  }

  assert!(s.describe_table("workouts").await.is_ok());
}

#[tokio::test]
async fn query_rejects_other_mutations() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  for sql in [
    "INSERT INTO workouts (date) VALUES ('2023-01-01')",
    "UPDATE workouts SET weight = 0",
    "DELETE FROM workouts",
    "ALTER TABLE workouts ADD COLUMN x TEXT",
    "CREATE TABLE other (x TEXT)",
  ] {
    let err = s.query(sql).await.unwrap_err();
    assert!(
      matches!(err, Error::Core(CoreError::ForbiddenOperation(_))),
      "{sql}"
    );
  }
}

#[tokio::test]
async fn query_is_idempotent() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  s.insert_rows("workouts", vec![row(&[
    date(),
    ("exercise", Scalar::Text("squat".into())),
    ("weight", Scalar::Real(225.0)),
  ])])
  .await
  .unwrap();

  let sql = "SELECT exercise, max(weight) AS top FROM workouts GROUP BY exercise";
  let first = s.query(sql).await.unwrap();
  let second = s.query(sql).await.unwrap();
  assert_eq!(first.columns, second.columns);
  assert_eq!(first.rows, second.rows);
}

#[tokio::test]
async fn query_with_no_matches_returns_empty_rows_not_an_error() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();

  let out = s
    .query("SELECT * FROM workouts WHERE exercise = 'curl'")
    .await
    .unwrap();
  assert!(out.is_empty());
  assert!(!out.columns.is_empty());
}

#[tokio::test]
async fn query_malformed_sql_reports_database_message() {
  let s = store().await;
  let err = s.query("SELECT FROM WHERE").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::QueryExecution(_))));

  let err = s.query("SELECT * FROM missing_table").await.unwrap_err();
  let Error::Core(CoreError::QueryExecution(message)) = err else {
    panic!("expected query execution error")
  };
  assert!(message.contains("missing_table"));
}

#[tokio::test]
async fn query_joins_across_tables() {
  let s = store().await;
  s.create_table(workouts()).await.unwrap();
  let mood = NewTable {
    name:        "mood".into(),
    description: "daily mood".into(),
    purpose:     String::new(),
    columns:     vec![col("rating", ColumnType::Integer)],
  };
  s.create_table(mood).await.unwrap();

  s.insert_rows("workouts", vec![row(&[
    date(),
    ("exercise", Scalar::Text("squat".into())),
  ])])
  .await
  .unwrap();
  s.insert_rows("mood", vec![row(&[date(), ("rating", Scalar::Integer(7))])])
    .await
    .unwrap();

  let out = s
    .query(
      "SELECT date(w.date) AS day, count(w.id) AS workouts, avg(m.rating) \
       AS avg_mood FROM workouts w \
       LEFT JOIN mood m ON date(m.date) = date(w.date) \
       GROUP BY date(w.date)",
    )
    .await
    .unwrap();
  assert_eq!(out.rows.len(), 1);
  assert_eq!(out.rows[0][1], Scalar::Integer(1));
  assert_eq!(out.rows[0][2], Scalar::Real(7.0));
}
