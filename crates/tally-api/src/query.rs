//! Handler for `POST /query`.
//!
//! Executes one read-only statement and shapes the result for the caller:
//! `raw` returns the rows as records, `summary` a short preview, `table`
//! a markdown table. The store always produces the full ordered result
//! set; shaping happens here.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tally_core::{
  store::LogStore,
  value::{QueryOutput, Row},
};

use crate::error::ApiError;

/// How many rows a `summary` preview shows.
const SUMMARY_PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
  #[default]
  Raw,
  Summary,
  Table,
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
  pub sql:    String,
  #[serde(default)]
  pub format: Format,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
  pub row_count: usize,
  pub columns:   Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rows:      Option<Vec<Row>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rendered:  Option<String>,
}

/// `POST /query` — body: `{"sql": "...", "format": "raw|summary|table"}`.
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<QueryBody>,
) -> Result<Json<QueryResponse>, ApiError>
where
  S: LogStore,
{
  let output = store
    .query(&body.sql)
    .await
    .map_err(ApiError::from_store)?;

  let response = match body.format {
    Format::Raw => QueryResponse {
      row_count: output.rows.len(),
      rows:      Some(output.records()),
      rendered:  None,
      columns:   output.columns,
    },
    Format::Summary => QueryResponse {
      row_count: output.rows.len(),
      rows:      None,
      rendered:  Some(render_summary(&output)),
      columns:   output.columns,
    },
    Format::Table => QueryResponse {
      row_count: output.rows.len(),
      rows:      None,
      rendered:  Some(render_table(&output)),
      columns:   output.columns,
    },
  };
  Ok(Json(response))
}

// ─── Rendering ────────────────────────────────────────────────────────────────

/// Row/column counts plus the first few rows.
fn render_summary(output: &QueryOutput) -> String {
  if output.is_empty() {
    return "No results found.".to_owned();
  }

  let mut text = format!(
    "{} rows, columns: {}\n",
    output.rows.len(),
    output.columns.join(", ")
  );
  for (i, row) in output.rows.iter().take(SUMMARY_PREVIEW_ROWS).enumerate() {
    let cells: Vec<String> = output
      .columns
      .iter()
      .zip(row)
      .map(|(name, value)| format!("{name}={value}"))
      .collect();
    text.push_str(&format!("row {}: {}\n", i + 1, cells.join(", ")));
  }
  if output.rows.len() > SUMMARY_PREVIEW_ROWS {
    text.push_str(&format!(
      "… and {} more rows\n",
      output.rows.len() - SUMMARY_PREVIEW_ROWS
    ));
  }
  text
}

/// A GitHub-flavored markdown table of the full result set.
fn render_table(output: &QueryOutput) -> String {
  if output.is_empty() {
    return "No results found.".to_owned();
  }

  let mut text = format!("| {} |\n", output.columns.join(" | "));
  text.push_str(&format!(
    "|{}|\n",
    output.columns.iter().map(|_| " --- ").collect::<Vec<_>>().join("|")
  ));
  for row in &output.rows {
    let cells: Vec<String> =
      row.iter().map(|value| value.to_string()).collect();
    text.push_str(&format!("| {} |\n", cells.join(" | ")));
  }
  text.push_str(&format!("\n{} rows returned", output.rows.len()));
  text
}
