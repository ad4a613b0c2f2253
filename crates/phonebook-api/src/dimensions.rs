//! Handlers for lookup dimensions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dimensions/{kind}` | `division`, `department`, `title` or `company` |
//! | `POST` | `/admin/dimensions/{kind}/{id}/weight` | Body: `{"delta": 10}`; result clamped to 0..=100 |

use axum::{
  Json,
  extract::{Path, State},
};
use phonebook_core::{
  dimension::{Dimension, DimensionId, DimensionKind},
  store::DirectoryStore,
};
use phonebook_sync::DirectoryFetcher;
use serde::Deserialize;

use crate::{ApiState, auth::Authenticated, error::ApiError};

fn parse_kind(kind: &str) -> Result<DimensionKind, ApiError> {
  DimensionKind::parse(kind).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// `GET /dimensions/{kind}`
pub async fn list<S, F>(
  State(state): State<ApiState<S, F>>,
  Path(kind): Path<String>,
) -> Result<Json<Vec<Dimension>>, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  let kind = parse_kind(&kind)?;
  let rows = state.store.list_dimensions(kind).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct WeightBody {
  pub delta: i32,
}

/// `POST /admin/dimensions/{kind}/{id}/weight`
pub async fn adjust_weight<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path((kind, id)): Path<(String, DimensionId)>,
  Json(body): Json<WeightBody>,
) -> Result<Json<Dimension>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let kind = parse_kind(&kind)?;
  let row = state
    .store
    .adjust_weight(kind, id, body.delta)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("{kind} {id} not found")))?;
  tracing::info!(%kind, id, weight = row.weight, "dimension weight adjusted");
  Ok(Json(row))
}
