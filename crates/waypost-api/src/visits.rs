//! Handler for `/v1/social/visits`.

use axum::{Json, extract::State};
use waypost_core::{
  external::{Geocoder, ImageHost, TokenVerifier},
  store::MapStore,
  visit::Visit,
  workflow,
};

use crate::{AppState, Caller, error::ApiError};

/// `GET /v1/social/visits` — visits received by the caller, newest
/// first, at most 100.
pub async fn list_received<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  caller: Caller,
) -> Result<Json<Vec<Visit>>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let visits = workflow::visits_received(state.store.as_ref(), caller.email()).await?;
  Ok(Json(visits))
}
