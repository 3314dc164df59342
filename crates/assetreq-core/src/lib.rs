//! Core types and trait definitions for the asset request tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the request/item/issuance model, the workflow rules, the request
//! number format and the audit snapshot rules. Storage backends and the API
//! depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod cart;
pub mod employee;
pub mod error;
pub mod issuance;
pub mod request;
pub mod sequence;
pub mod status;
pub mod store;
pub mod workflow;

pub use error::{Classify, Error, ErrorKind, Result};
