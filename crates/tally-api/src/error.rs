//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the tool surface as
//! `{"error": {"reason": "<snake_case>", "message": "<human>"}}` so the
//! calling agent can branch on the reason without parsing prose.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::{Reason, store::StoreError};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A failure surfaced by the store, already categorised.
  #[error("{message}")]
  Store { reason: Reason, message: String },

  /// The request body did not have the expected shape.
  #[error("malformed request: {0}")]
  Payload(String),
}

impl ApiError {
  pub fn from_store<E: StoreError>(e: E) -> Self {
    Self::Store { reason: e.reason(), message: e.to_string() }
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::Store { reason: Reason::NotFound, message: message.into() }
  }
}

fn status_for(reason: Reason) -> StatusCode {
  match reason {
    Reason::NotFound => StatusCode::NOT_FOUND,
    Reason::AlreadyExists => StatusCode::CONFLICT,
    Reason::Validation
    | Reason::UnknownColumn
    | Reason::ProtectedField
    | Reason::QueryExecution => StatusCode::BAD_REQUEST,
    Reason::ForbiddenOperation => StatusCode::FORBIDDEN,
    Reason::Storage => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, reason, message) = match self {
      ApiError::Store { reason, message } => {
        (status_for(reason), reason, message)
      }
      ApiError::Payload(message) => {
        (StatusCode::BAD_REQUEST, Reason::Validation, message)
      }
    };
    (
      status,
      Json(json!({ "error": { "reason": reason, "message": message } })),
    )
      .into_response()
  }
}
