//! HTTP server wiring for the asset request tracker.
//!
//! Holds the runtime configuration and assembles the application router: the
//! JSON API from `assetreq-api` wrapped in request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use assetreq_core::store::RequestStore;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Runtime server configuration, deserialised from `config.toml` and
/// `ASSETREQ_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Build the application router for `store`.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: RequestStore + 'static,
{
  assetreq_api::api_router(store).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use assetreq_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn paths_without_tilde_are_untouched() {
    let p = Path::new("/var/lib/assetreq/requests.db");
    assert_eq!(expand_tilde(p), p);
  }

  #[test]
  fn address_joins_host_and_port() {
    let cfg = ServerConfig {
      host:       "0.0.0.0".into(),
      port:       8080,
      store_path: PathBuf::from("requests.db"),
    };
    assert_eq!(cfg.address(), "0.0.0.0:8080");
  }

  #[tokio::test]
  async fn app_serves_the_api() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let resp = app(Arc::new(store))
      .oneshot(
        Request::builder()
          .uri("/requests/counts")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let counts: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(counts[0]["label"], "All");
  }
}
