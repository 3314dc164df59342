//! Handlers for `/issuances` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/issuances/pending` | Unacknowledged issuances addressed to the actor |
//! | `GET`  | `/issuances/{id}` | 404 if not found |
//! | `POST` | `/issuances/{id}/acknowledge` | Actor must be the designated recipient |

use std::sync::Arc;

use assetreq_core::{issuance::Issuance, store::RequestStore};
use axum::{
  Json,
  extract::State,
  response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError, extract::PathParams};

/// `GET /issuances/pending`
pub async fn pending<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Issuance>>, ApiError>
where
  S: RequestStore,
{
  let issuances = store
    .pending_acknowledgments(actor.employee_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(issuances))
}

/// `GET /issuances/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  PathParams(id): PathParams<Uuid>,
) -> Result<Json<Issuance>, ApiError>
where
  S: RequestStore,
{
  let issuance = store
    .get_issuance(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("issuance not found: {id}")))?;
  Ok(Json(issuance))
}

/// `POST /issuances/{id}/acknowledge`
pub async fn acknowledge<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
  PathParams(id): PathParams<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
{
  let issuance = store.acknowledge(actor, id).await.map_err(ApiError::store)?;
  Ok(Json(json!({
    "success": true,
    "message": "receipt acknowledged",
    "issuance": issuance,
  })))
}
