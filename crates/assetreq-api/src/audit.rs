//! `GET /audit/{entity_type}/{entity_id}`: the audit trail of one entity.
//!
//! `entity_type` is one of `request`, `request_item`, `issuance`.

use std::sync::Arc;

use assetreq_core::{
  Error as CoreError,
  audit::{AuditEntry, EntityType},
  store::RequestStore,
};
use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{error::ApiError, extract::PathParams};

pub async fn trail<S>(
  State(store): State<Arc<S>>,
  PathParams((entity_type, entity_id)): PathParams<(String, Uuid)>,
) -> Result<Json<Vec<AuditEntry>>, ApiError>
where
  S: RequestStore,
{
  let entity_type: EntityType = entity_type.parse().map_err(|_| {
    ApiError::store(CoreError::validation(format!(
      "unknown entity type {entity_type:?}"
    )))
  })?;
  let entries = store
    .audit_trail(entity_type, entity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}
