//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use phonebook_core::reconcile::SyncPhase;
use phonebook_sync::{SyncError, error::FetchError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A sync cycle failed. Only a generic reason is sent to the client.
  #[error("sync failed during {phase}: {reason}")]
  Sync {
    status: StatusCode,
    phase:  SyncPhase,
    reason: &'static str,
  },
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl<E: std::error::Error + 'static> From<SyncError<E>> for ApiError {
  fn from(e: SyncError<E>) -> Self {
    let status = match &e {
      SyncError::SourceNotFound(id) => return Self::NotFound(format!("source {id} not found")),
      SyncError::Fetch(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
      SyncError::Fetch(_) | SyncError::Malformed { .. } => StatusCode::BAD_GATEWAY,
      SyncError::Store(_) | SyncError::Reconcile(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Self::Sync { status, phase: e.phase(), reason: e.summary() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthorized" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"phonebook\""),
        );
        return res;
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
      }
      ApiError::Sync { status, phase, reason } => {
        (*status, json!({ "error": reason, "phase": phase }))
      }
    };
    (status, Json(body)).into_response()
  }
}
