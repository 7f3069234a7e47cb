//! Error taxonomy for the Waypost core workflow.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing, malformed, or unverifiable bearer credential.
  ///
  /// Every identity-provider failure (bad signature, expiry, wrong
  /// audience, provider unreachable) collapses into this variant so
  /// provider internals never leak to clients.
  #[error("invalid credential")]
  InvalidCredential,

  /// Authenticated, but not the author of the targeted review.
  #[error("only the author may modify this review")]
  Forbidden,

  #[error("review not found: {0}")]
  ReviewNotFound(Uuid),

  #[error("no location found for {0:?}")]
  LocationNotFound(String),

  #[error("rating must be between 0 and 5, got {0}")]
  InvalidRating(i64),

  #[error("geocoding service unavailable: {0}")]
  GeocodingUnavailable(String),

  #[error("image upload failed: {0}")]
  UploadFailed(String),

  #[error("missing configuration: {0}")]
  Misconfigured(&'static str),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend-specific store error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
