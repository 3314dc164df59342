//! The `RequestStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `assetreq-store-sqlite`). The API layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  audit::{AuditEntry, EntityType},
  employee::{Actor, Employee, EmployeeId},
  error::Classify,
  issuance::{Issuance, IssueItem},
  request::{
    NewRequest, Request, RequestDetail, RequestItem, RequestPage, RequestRef,
    StatusCount, SubmittedRequest,
  },
  status::RequestStatus,
  workflow::Action,
};

// ─── Query type ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
  #[default]
  CreatedAt,
  RequestNumber,
  Status,
  RequestorName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Parameters for [`RequestStore::list_requests`].
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
  pub status: Option<RequestStatus>,
  /// Free-text filter over request number, requestor name, department and
  /// remarks.
  pub text:   Option<String>,
  pub sort:   SortField,
  pub order:  SortOrder,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a request/issuance store backend.
///
/// Every mutating method runs as one atomic unit: it either applies fully or
/// leaves no trace. Workflow preconditions are checked against the state
/// inside that unit. Audit entries are written after the unit commits and
/// their failure is never reported through these methods.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RequestStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Directory ─────────────────────────────────────────────────────────

  /// Insert or replace a cached directory entry.
  fn upsert_employee(
    &self,
    employee: Employee,
  ) -> impl Future<Output = Result<Employee, Self::Error>> + Send + '_;

  fn get_employee(
    &self,
    id: EmployeeId,
  ) -> impl Future<Output = Result<Option<Employee>, Self::Error>> + Send + '_;

  // ── Workflow ──────────────────────────────────────────────────────────

  /// Validate and expand the cart, allocate the next request number for the
  /// current year, and persist the request with all its items.
  fn submit(
    &self,
    actor: Actor,
    input: NewRequest,
  ) -> impl Future<Output = Result<SubmittedRequest, Self::Error>> + Send + '_;

  /// Apply an actor-driven status change.
  fn transition(
    &self,
    actor: Actor,
    request: RequestRef,
    action: Action,
    remarks: Option<String>,
  ) -> impl Future<Output = Result<Request, Self::Error>> + Send + '_;

  /// Issue one pending item of an approved request.
  fn issue_item(
    &self,
    actor: Actor,
    request: RequestRef,
    item_id: Uuid,
    input: IssueItem,
  ) -> impl Future<Output = Result<Issuance, Self::Error>> + Send + '_;

  /// Cancel one pending item.
  fn cancel_item(
    &self,
    actor: Actor,
    request: RequestRef,
    item_id: Uuid,
    remarks: Option<String>,
  ) -> impl Future<Output = Result<RequestItem, Self::Error>> + Send + '_;

  /// Acknowledge receipt. The actor must be the designated recipient.
  fn acknowledge(
    &self,
    actor: Actor,
    issuance_id: Uuid,
  ) -> impl Future<Output = Result<Issuance, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Returns `None` if no request matches.
  fn get_request(
    &self,
    request: RequestRef,
  ) -> impl Future<Output = Result<Option<RequestDetail>, Self::Error>> + Send + '_;

  fn list_requests<'a>(
    &'a self,
    query: &'a RequestQuery,
  ) -> impl Future<Output = Result<RequestPage, Self::Error>> + Send + 'a;

  /// One bucket per status plus a leading "All" bucket.
  fn status_counts(
    &self,
  ) -> impl Future<Output = Result<Vec<StatusCount>, Self::Error>> + Send + '_;

  fn get_issuance(
    &self,
    issuance_id: Uuid,
  ) -> impl Future<Output = Result<Option<Issuance>, Self::Error>> + Send + '_;

  /// Unacknowledged issuances addressed to `recipient`, oldest first.
  fn pending_acknowledgments(
    &self,
    recipient: EmployeeId,
  ) -> impl Future<Output = Result<Vec<Issuance>, Self::Error>> + Send + '_;

  /// Audit entries for one entity, in the order they were written.
  fn audit_trail(
    &self,
    entity_type: EntityType,
    entity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;
}
