//! `GET /health`: liveness check for load balancers and uptime monitors.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
  pub status:    &'static str,
  pub timestamp: DateTime<Utc>,
}

pub async fn health() -> Json<Health> {
  Json(Health { status: "ok", timestamp: Utc::now() })
}
