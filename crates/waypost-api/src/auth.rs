//! Handler for `/v1/auth/login`.

use axum::{Json, extract::State};
use serde::Deserialize;
use waypost_core::{
  external::{Geocoder, ImageHost, TokenVerifier},
  principal::Principal,
  store::MapStore,
  workflow,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub token: String,
}

/// `POST /v1/auth/login` — body: `{"token":"..."}`.
///
/// Verifies the credential with the identity provider, then creates the
/// principal on first sight or refreshes its profile otherwise. A
/// rejected token returns 401 and touches no rows.
pub async fn login<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Principal>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let principal =
    workflow::login(state.store.as_ref(), state.verifier.as_ref(), &body.token)
      .await?;
  Ok(Json(principal))
}
