//! JSON tool surface for Tally.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::LogStore`].
//! Each route is one tool the calling agent invokes; transport concerns
//! beyond JSON-over-HTTP are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod guidance;
pub mod query;
pub mod rows;
pub mod tables;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::store::LogStore;

pub use error::ApiError;

/// Build a fully-materialised tool router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: LogStore + 'static,
{
  Router::new()
    // Discover and evolve
    .route("/tables", get(tables::list::<S>).post(tables::create::<S>))
    .route("/tables/{name}", get(tables::describe::<S>))
    .route("/tables/{name}/schema", post(tables::edit_schema::<S>))
    // Store
    .route("/tables/{name}/rows", post(rows::insert::<S>))
    // Analyze
    .route("/query", post(query::handler::<S>))
    // Agent guidance documents
    .route("/guidance", get(guidance::list))
    .route("/guidance/{topic}", get(guidance::get_one))
    .with_state(store)
}
