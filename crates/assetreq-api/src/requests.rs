//! Handlers for `/requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/requests` | Body: [`NewRequest`]; actor required |
//! | `GET`  | `/requests` | `?status=&text=&sort=&order=&limit=&offset=` |
//! | `GET`  | `/requests/counts` | Dashboard buckets |
//! | `GET`  | `/requests/{reference}` | Id or request number; 404 if not found |
//! | `POST` | `/requests/{reference}/transition` | Body: `{"action":"TRIAGE","remarks":null}` |
//! | `POST` | `/requests/{reference}/items/{item_id}/issue` | Body: [`IssueItem`] |
//! | `POST` | `/requests/{reference}/items/{item_id}/cancel` | Body: `{"remarks":"..."}` |

use std::{convert::Infallible, sync::Arc};

use assetreq_core::{
  Error as CoreError,
  issuance::IssueItem,
  request::{NewRequest, RequestDetail, RequestPage, RequestRef, StatusCount},
  status::RequestStatus,
  store::{RequestQuery, RequestStore, SortField, SortOrder},
  workflow::Action,
};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
  actor::CurrentActor,
  error::ApiError,
  extract::{JsonBody, PathParams, QueryParams},
};

fn parse_ref(reference: &str) -> RequestRef {
  reference
    .parse()
    .unwrap_or_else(|never: Infallible| match never {})
}

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /requests`
pub async fn submit<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
  JsonBody(body): JsonBody<NewRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
{
  let submitted = store.submit(actor, body).await.map_err(ApiError::store)?;
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "success": true,
      "message": format!("request {} submitted", submitted.request_number),
      "request_number": submitted.request_number,
      "request_id": submitted.request_id,
    })),
  ))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status: Option<RequestStatus>,
  pub text:   Option<String>,
  pub sort:   Option<SortField>,
  pub order:  Option<SortOrder>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl From<ListParams> for RequestQuery {
  fn from(p: ListParams) -> Self {
    Self {
      status: p.status,
      text:   p.text,
      sort:   p.sort.unwrap_or_default(),
      order:  p.order.unwrap_or_default(),
      limit:  p.limit,
      offset: p.offset,
    }
  }
}

/// `GET /requests`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<RequestPage>, ApiError>
where
  S: RequestStore,
{
  let query = RequestQuery::from(params);
  let page = store.list_requests(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `GET /requests/counts`
pub async fn counts<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<StatusCount>>, ApiError>
where
  S: RequestStore,
{
  let counts = store.status_counts().await.map_err(ApiError::store)?;
  Ok(Json(counts))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /requests/{reference}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  PathParams(reference): PathParams<String>,
) -> Result<Json<RequestDetail>, ApiError>
where
  S: RequestStore,
{
  let detail = store
    .get_request(parse_ref(&reference))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("request not found: {reference}")))?;
  Ok(Json(detail))
}

// ─── Transition ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  /// Action name, case-insensitive: `TRIAGE`, `APPROVE`, `DISAPPROVE`,
  /// `CANCEL`.
  pub action:  String,
  #[serde(default)]
  pub remarks: Option<String>,
}

/// `POST /requests/{reference}/transition`
pub async fn transition<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
  PathParams(reference): PathParams<String>,
  JsonBody(body): JsonBody<TransitionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
{
  let action: Action = body.action.trim().parse().map_err(|_| {
    ApiError::store(CoreError::validation(format!(
      "unknown action {:?}",
      body.action
    )))
  })?;

  let request = store
    .transition(actor, parse_ref(&reference), action, body.remarks)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({
    "success": true,
    "message": format!(
      "request {} is now {}",
      request.request_number,
      request.status.label()
    ),
    "request": request,
  })))
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// `POST /requests/{reference}/items/{item_id}/issue`
pub async fn issue_item<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
  PathParams((reference, item_id)): PathParams<(String, Uuid)>,
  JsonBody(body): JsonBody<IssueItem>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
{
  let issuance = store
    .issue_item(actor, parse_ref(&reference), item_id, body)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({
    "success": true,
    "message": format!("item {item_id} issued"),
    "issuance": issuance,
  })))
}

#[derive(Debug, Deserialize)]
pub struct CancelItemBody {
  #[serde(default)]
  pub remarks: Option<String>,
}

/// `POST /requests/{reference}/items/{item_id}/cancel`
pub async fn cancel_item<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
  PathParams((reference, item_id)): PathParams<(String, Uuid)>,
  JsonBody(body): JsonBody<CancelItemBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
{
  let item = store
    .cancel_item(actor, parse_ref(&reference), item_id, body.remarks)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({
    "success": true,
    "message": format!("item {item_id} canceled"),
    "item": item,
  })))
}
