//! Extractor for the acting employee.

use assetreq_core::employee::{Actor, EmployeeId};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// The employee performing the call. Present in a handler means the actor
/// headers were well-formed.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

/// Read the actor from headers. The id is required; the name may be absent.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let employee_id = headers
    .get(ACTOR_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<EmployeeId>().ok())
    .ok_or(ApiError::Unauthenticated)?;

  let name = headers
    .get(ACTOR_NAME_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .unwrap_or_default();

  Ok(Actor::new(employee_id, name))
}

impl<S> FromRequestParts<S> for CurrentActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(Self)
  }
}
