//! Handler for `/v1/geocoding/autocomplete`.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use waypost_core::{
  external::{Geocoder, ImageHost, Place, TokenVerifier},
  store::MapStore,
};

use crate::{AppState, error::ApiError};

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
  pub q:     String,
  pub limit: Option<usize>,
}

/// `GET /v1/geocoding/autocomplete?q=<text>[&limit=<n>]`
///
/// Autocomplete fails soft: queries under two characters and provider
/// errors both yield an empty list rather than an error.
pub async fn autocomplete<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<Place>>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  if params.q.trim().len() < 2 {
    return Ok(Json(vec![]));
  }

  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
  let places = state
    .geocoder
    .search(&params.q, limit)
    .await
    .unwrap_or_default();

  Ok(Json(places))
}
