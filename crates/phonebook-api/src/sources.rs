//! Handlers for `/admin/sources` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admin/sources` | `?active_only=true` to hide inactive |
//! | `POST`   | `/admin/sources` | 201 |
//! | `GET`    | `/admin/sources/{id}` | 404 if not found |
//! | `PUT`    | `/admin/sources/{id}` | empty `bind_password` keeps the stored one |
//! | `DELETE` | `/admin/sources/{id}` | cascades to the source's contacts; 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use phonebook_core::{
  source::{DirectorySource, NewSource, SourceId},
  store::DirectoryStore,
};
use phonebook_sync::DirectoryFetcher;
use serde::Deserialize;

use crate::{ApiState, auth::Authenticated, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active_only: bool,
}

/// `GET /admin/sources`
pub async fn list<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DirectorySource>>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let sources = state
    .store
    .list_sources(params.active_only)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sources))
}

/// `POST /admin/sources`
pub async fn create<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Json(body): Json<NewSource>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let source = state.store.add_source(body).await.map_err(ApiError::store)?;
  tracing::info!(source_id = source.id, name = %source.name, "source created");
  Ok((StatusCode::CREATED, Json(source)))
}

/// `GET /admin/sources/{id}`
pub async fn get_one<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path(id): Path<SourceId>,
) -> Result<Json<DirectorySource>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let source = state
    .store
    .get_source(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("source {id} not found")))?;
  Ok(Json(source))
}

/// `PUT /admin/sources/{id}`
pub async fn update<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path(id): Path<SourceId>,
  Json(body): Json<NewSource>,
) -> Result<Json<DirectorySource>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let source = state
    .store
    .update_source(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("source {id} not found")))?;
  Ok(Json(source))
}

/// `DELETE /admin/sources/{id}`
pub async fn delete<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path(id): Path<SourceId>,
) -> Result<StatusCode, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let deleted = state.store.delete_source(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("source {id} not found")));
  }
  tracing::info!(source_id = id, "source deleted");
  Ok(StatusCode::NO_CONTENT)
}
