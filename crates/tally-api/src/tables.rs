//! Handlers for `/tables` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tables` | Overview of every table |
//! | `GET`  | `/tables/:name` | Full detail: columns, metadata, recent rows |
//! | `POST` | `/tables` | Body: [`CreateTableBody`]; returns 201 + detail |
//! | `POST` | `/tables/:name/schema` | Body: [`EditSchemaBody`]; atomic batch |
//!
//! Column types arrive as strings (`"real"`, `"integer"`, …) and are parsed
//! here so an unrecognized type surfaces as a `validation` failure payload
//! rather than a raw deserialisation error.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tally_core::{
  column::{ColumnSpec, ColumnType},
  mutation::{SchemaChange, SchemaOp},
  store::LogStore,
  table::{NewTable, TableDetail, TableSummary},
};

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /tables`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<TableSummary>>, ApiError>
where
  S: LogStore,
{
  let tables = store.list_tables().await.map_err(ApiError::from_store)?;
  Ok(Json(tables))
}

/// `GET /tables/:name`
pub async fn describe<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
) -> Result<Json<TableDetail>, ApiError>
where
  S: LogStore,
{
  let detail = store
    .describe_table(&name)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(detail))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ColumnBody {
  pub name:        String,
  pub r#type:      String,
  pub description: String,
  pub unit:        Option<String>,
  #[serde(default)]
  pub required:    bool,
}

impl ColumnBody {
  fn into_spec(self) -> Result<ColumnSpec, ApiError> {
    let column_type: ColumnType =
      self.r#type.parse().map_err(ApiError::from_store)?;
    Ok(ColumnSpec {
      name: self.name,
      column_type,
      description: self.description,
      unit: self.unit,
      required: self.required,
    })
  }
}

/// JSON body accepted by `POST /tables`.
#[derive(Debug, Deserialize)]
pub struct CreateTableBody {
  pub name:        String,
  pub description: String,
  pub purpose:     Option<String>,
  pub columns:     Vec<ColumnBody>,
}

/// `POST /tables` — returns 201 + the created table's detail.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateTableBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LogStore,
{
  let spec = NewTable {
    name:        body.name,
    description: body.description,
    purpose:     body.purpose.unwrap_or_default(),
    columns:     body
      .columns
      .into_iter()
      .map(ColumnBody::into_spec)
      .collect::<Result<_, _>>()?,
  };
  let detail = store
    .create_table(spec)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(detail)))
}

// ─── Edit schema ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OpBody {
  AddColumn {
    name:        String,
    r#type:      String,
    #[serde(default)]
    description: String,
    unit:        Option<String>,
    #[serde(default)]
    required:    bool,
  },
  RenameColumn {
    name:     String,
    new_name: String,
  },
  RetypeColumn {
    name:     String,
    new_type: String,
  },
  DropColumn {
    name: String,
  },
}

impl OpBody {
  fn into_op(self) -> Result<SchemaOp, ApiError> {
    Ok(match self {
      Self::AddColumn { name, r#type, description, unit, required } => {
        SchemaOp::AddColumn {
          column: ColumnBody { name, r#type, description, unit, required }
            .into_spec()?,
        }
      }
      Self::RenameColumn { name, new_name } => {
        SchemaOp::RenameColumn { name, new_name }
      }
      Self::RetypeColumn { name, new_type } => SchemaOp::RetypeColumn {
        name,
        new_type: new_type.parse().map_err(ApiError::from_store)?,
      },
      Self::DropColumn { name } => SchemaOp::DropColumn { name },
    })
  }
}

/// JSON body accepted by `POST /tables/:name/schema`.
#[derive(Debug, Deserialize)]
pub struct EditSchemaBody {
  pub operations: Vec<OpBody>,
}

/// `POST /tables/:name/schema` — applies all operations atomically.
pub async fn edit_schema<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
  Json(body): Json<EditSchemaBody>,
) -> Result<Json<SchemaChange>, ApiError>
where
  S: LogStore,
{
  let ops = body
    .operations
    .into_iter()
    .map(OpBody::into_op)
    .collect::<Result<Vec<_>, _>>()?;
  let change = store
    .edit_schema(&name, ops)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(change))
}
