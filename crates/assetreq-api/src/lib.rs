//! JSON REST API for the asset request tracker.
//!
//! Exposes an axum [`Router`] backed by any
//! [`assetreq_core::store::RequestStore`]. The acting employee is taken from
//! the `x-actor-id` / `x-actor-name` headers set by the upstream gateway;
//! authentication, TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", assetreq_api::api_router(store.clone()))
//! ```

pub mod actor;
pub mod audit;
pub mod employees;
pub mod error;
pub mod extract;
pub mod issuances;
pub mod requests;

use std::sync::Arc;

use assetreq_core::store::RequestStore;
use axum::{
  Router,
  routing::{get, post, put},
};

pub use actor::CurrentActor;
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RequestStore + 'static,
{
  Router::new()
    // Requests
    .route("/requests", get(requests::list::<S>).post(requests::submit::<S>))
    .route("/requests/counts", get(requests::counts::<S>))
    .route("/requests/{reference}", get(requests::get_one::<S>))
    .route("/requests/{reference}/transition", post(requests::transition::<S>))
    .route(
      "/requests/{reference}/items/{item_id}/issue",
      post(requests::issue_item::<S>),
    )
    .route(
      "/requests/{reference}/items/{item_id}/cancel",
      post(requests::cancel_item::<S>),
    )
    // Issuances
    .route("/issuances/pending", get(issuances::pending::<S>))
    .route("/issuances/{id}", get(issuances::get_one::<S>))
    .route("/issuances/{id}/acknowledge", post(issuances::acknowledge::<S>))
    // Audit
    .route("/audit/{entity_type}/{entity_id}", get(audit::trail::<S>))
    // Directory
    .route("/employees/{id}", put(employees::upsert::<S>))
    .with_state(store)
}
