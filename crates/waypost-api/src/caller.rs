//! Bearer-credential extractor.
//!
//! Present in a handler's signature means the request carried a
//! well-formed `Authorization: Bearer <token>` header *and* the token
//! verified against the identity provider. A malformed header is
//! rejected before the provider is ever contacted.

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use waypost_core::{
  Error as CoreError,
  external::{Geocoder, ImageHost, TokenVerifier},
  principal::VerifiedIdentity,
  store::MapStore,
};

use crate::{AppState, error::ApiError};

/// A verified caller: the identity extracted from the bearer credential,
/// plus the literal credential string (persisted on visits and reviews).
#[derive(Debug, Clone)]
pub struct Caller {
  pub identity:   VerifiedIdentity,
  pub credential: String,
}

impl Caller {
  pub fn email(&self) -> &str { &self.identity.email }
}

impl<S, V, G, I> FromRequestParts<AppState<S, V, G, I>> for Caller
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, V, G, I>,
  ) -> Result<Self, Self::Rejection> {
    let header_val = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(CoreError::InvalidCredential)?;

    let token = header_val
      .strip_prefix("Bearer ")
      .ok_or(CoreError::InvalidCredential)?;

    let identity = state.verifier.verify(token).await?;

    Ok(Caller {
      identity,
      credential: token.to_owned(),
    })
  }
}
