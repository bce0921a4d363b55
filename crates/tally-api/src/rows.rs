//! Handler for `POST /tables/:name/rows`.
//!
//! The body is either a single record or a non-empty array of records; the
//! whole batch inserts atomically and the generated row ids come back in
//! input order.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tally_core::{store::LogStore, value::Row};
use uuid::Uuid;

use crate::error::ApiError;

/// A single record or a batch of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RowsBody {
  Many(Vec<Row>),
  One(Row),
}

impl From<RowsBody> for Vec<Row> {
  fn from(body: RowsBody) -> Self {
    match body {
      RowsBody::Many(rows) => rows,
      RowsBody::One(row) => vec![row],
    }
  }
}

#[derive(Debug, Serialize)]
pub struct InsertResponse {
  pub table:    String,
  pub inserted: usize,
  /// Generated row ids, in input order.
  pub ids:      Vec<Uuid>,
}

/// `POST /tables/:name/rows` — returns 201 + the generated ids.
pub async fn insert<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
  Json(body): Json<RowsBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LogStore,
{
  let rows: Vec<Row> = body.into();
  let ids = store
    .insert_rows(&name, rows)
    .await
    .map_err(ApiError::from_store)?;
  Ok((
    StatusCode::CREATED,
    Json(InsertResponse { table: name, inserted: ids.len(), ids }),
  ))
}
