//! `PUT /employees/{id}`: refresh one entry of the cached HR directory.

use std::sync::Arc;

use assetreq_core::{
  employee::{Employee, EmployeeId},
  store::RequestStore,
};
use axum::{
  Json,
  extract::State,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  actor::CurrentActor,
  error::ApiError,
  extract::{JsonBody, PathParams},
};

#[derive(Debug, Deserialize)]
pub struct EmployeeBody {
  pub name:       String,
  #[serde(default)]
  pub department: Option<String>,
}

pub async fn upsert<S>(
  State(store): State<Arc<S>>,
  CurrentActor(actor): CurrentActor,
  PathParams(id): PathParams<EmployeeId>,
  JsonBody(body): JsonBody<EmployeeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
{
  let employee = store
    .upsert_employee(Employee {
      employee_id: id,
      name:        body.name,
      department:  body.department,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::debug!(employee_id = id, actor = actor.employee_id, "directory entry updated");
  Ok(Json(json!({
    "success": true,
    "message": format!("employee {id} saved"),
    "employee": employee,
  })))
}
