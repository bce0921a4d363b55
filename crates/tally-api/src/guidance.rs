//! Embedded markdown guidance documents for the calling agent.
//!
//! These are the decision trees the agent loads before using the tools:
//! when to create a table versus add a column, how to map free-form input
//! onto rows, and how to shape analysis queries. Served read-only.

use axum::{
  Json,
  extract::Path,
  http::header,
  response::{IntoResponse, Response},
};

use crate::error::ApiError;

pub const TOPICS: [(&str, &str); 3] = [
  ("schema-design", include_str!("../prompts/schema-design.md")),
  ("data-entry", include_str!("../prompts/data-entry.md")),
  ("analysis", include_str!("../prompts/analysis.md")),
];

/// `GET /guidance` — the available topic names.
pub async fn list() -> Json<Vec<&'static str>> {
  Json(TOPICS.iter().map(|(name, _)| *name).collect())
}

/// `GET /guidance/:topic` — one document, as markdown.
pub async fn get_one(Path(topic): Path<String>) -> Result<Response, ApiError> {
  let (_, body) = TOPICS
    .iter()
    .find(|(name, _)| *name == topic)
    .ok_or_else(|| {
      ApiError::not_found(format!("no guidance topic {topic:?}"))
    })?;
  Ok(
    (
      [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
      *body,
    )
      .into_response(),
  )
}
