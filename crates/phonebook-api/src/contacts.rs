//! Handlers for contact endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts` | `?page=&page_size=`; items carry their `group` |
//! | `GET`    | `/contacts/search` | `?q=` plus paging; blank `q` lists all |
//! | `GET`    | `/contacts/division/{name}` | case-insensitive name match |
//! | `GET`    | `/contacts/department/{name}` | |
//! | `GET`    | `/contacts/title/{name}` | |
//! | `GET`    | `/contacts/{id}` | 404 if unknown or hidden |
//! | `POST`   | `/admin/contacts` | manual contact; 201 |
//! | `PUT`    | `/admin/contacts/{id}` | manual contacts only |
//! | `DELETE` | `/admin/contacts/{id}` | manual contacts only; 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use phonebook_core::{
  contact::{ContactId, ContactView, NewManualContact},
  dimension::DimensionKind,
  query::{ContactQuery, ListedContact, PageResult},
  store::DirectoryStore,
};
use phonebook_sync::DirectoryFetcher;
use serde::Deserialize;

use crate::{ApiState, PageParams, auth::Authenticated, error::ApiError};

type Page = Json<PageResult<ListedContact>>;

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /contacts`
pub async fn list<S, F>(
  State(state): State<ApiState<S, F>>,
  Query(params): Query<PageParams>,
) -> Result<Page, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  let page = ContactQuery::new(state.store.as_ref())
    .all(state.paging.request(&params))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub q:         String,
  pub page:      Option<usize>,
  pub page_size: Option<usize>,
}

/// `GET /contacts/search?q=<text>`
pub async fn search<S, F>(
  State(state): State<ApiState<S, F>>,
  Query(params): Query<SearchParams>,
) -> Result<Page, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  let request = state.paging.request(&PageParams {
    page:      params.page,
    page_size: params.page_size,
  });
  let page = ContactQuery::new(state.store.as_ref())
    .search(&params.q, request)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

async fn by_dimension<S, F>(
  state: ApiState<S, F>,
  kind: DimensionKind,
  name: String,
  params: PageParams,
) -> Result<Page, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  let page = ContactQuery::new(state.store.as_ref())
    .by_dimension(kind, &name, state.paging.request(&params))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `GET /contacts/division/{name}`
pub async fn by_division<S, F>(
  State(state): State<ApiState<S, F>>,
  Path(name): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Page, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  by_dimension(state, DimensionKind::Division, name, params).await
}

/// `GET /contacts/department/{name}`
pub async fn by_department<S, F>(
  State(state): State<ApiState<S, F>>,
  Path(name): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Page, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  by_dimension(state, DimensionKind::Department, name, params).await
}

/// `GET /contacts/title/{name}`
pub async fn by_title<S, F>(
  State(state): State<ApiState<S, F>>,
  Path(name): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Page, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  by_dimension(state, DimensionKind::Title, name, params).await
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /contacts/{id}`
pub async fn get_one<S, F>(
  State(state): State<ApiState<S, F>>,
  Path(id): Path<ContactId>,
) -> Result<Json<ContactView>, ApiError>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  let contact = ContactQuery::new(state.store.as_ref())
    .by_id(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id} not found")))?;
  Ok(Json(contact))
}

// ─── Manual contacts ──────────────────────────────────────────────────────────

/// `POST /admin/contacts`
pub async fn create<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Json(body): Json<NewManualContact>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let contact = state
    .store
    .add_manual_contact(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(contact)))
}

/// `PUT /admin/contacts/{id}`
pub async fn update<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path(id): Path<ContactId>,
  Json(body): Json<NewManualContact>,
) -> Result<Json<ContactView>, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let contact = state
    .store
    .update_manual_contact(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("manual contact {id} not found")))?;
  Ok(Json(contact))
}

/// `DELETE /admin/contacts/{id}`
pub async fn delete<S, F>(
  _auth: Authenticated,
  State(state): State<ApiState<S, F>>,
  Path(id): Path<ContactId>,
) -> Result<StatusCode, ApiError>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  let deleted = state
    .store
    .delete_manual_contact(id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("manual contact {id} not found")));
  }
  Ok(StatusCode::NO_CONTENT)
}
