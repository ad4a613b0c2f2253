//! Handlers for on-demand sync triggers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/sources/{id}/sync` | also allowed for inactive sources |
//! | `POST` | `/admin/sources/sync-all` | active sources only; per-source results |

use axum::{
  Json,
  extract::{Path, State},
};
use phonebook_core::{source::SourceId, store::DirectoryStore};
use phonebook_sync::{BatchReport, DirectoryFetcher, SyncReport};

use crate::{ApiState, auth::Authenticated, error::ApiError};

/// `POST /admin/sources/{id}/sync`
pub async fn sync_one<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path(id): Path<SourceId>,
) -> Result<Json<SyncReport>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let report = state.reconciler.sync_source(id).await?;
  Ok(Json(report))
}

/// `POST /admin/sources/sync-all`
pub async fn sync_all<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
) -> Result<Json<BatchReport>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let batch = state.reconciler.sync_all().await?;
  Ok(Json(batch))
}
