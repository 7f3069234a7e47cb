//! Narrow contracts for the external collaborators: identity provider,
//! geocoding lookup, and image hosting.
//!
//! The server binary supplies the real implementations; tests supply
//! counting fakes.

use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{error::Result, principal::VerifiedIdentity};

/// An image payload as received from a multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub filename:     Option<String>,
  pub content_type: Option<String>,
  pub bytes:        Bytes,
}

/// A single geocoder match, as surfaced by the autocomplete endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
  pub display_name: String,
  pub lat:          f64,
  pub lon:          f64,
  #[serde(rename = "type", default)]
  pub kind:         String,
  #[serde(default)]
  pub class:        String,
}

/// Validates opaque bearer credentials against the identity provider.
pub trait TokenVerifier: Send + Sync {
  /// Verify `credential` and extract the principal attributes.
  ///
  /// Every provider-side failure must collapse to
  /// [`Error::InvalidCredential`](crate::Error::InvalidCredential).
  fn verify<'a>(
    &'a self,
    credential: &'a str,
  ) -> impl Future<Output = Result<VerifiedIdentity>> + Send + 'a;
}

/// Resolves free-text place names and postal addresses to coordinates.
pub trait Geocoder: Send + Sync {
  /// Resolve `query` to `(latitude, longitude)`.
  ///
  /// Errors with [`Error::LocationNotFound`](crate::Error::LocationNotFound)
  /// when the provider returns no match.
  fn coordinates<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<(f64, f64)>> + Send + 'a;

  /// Autocomplete search returning up to `limit` matches.
  fn search<'a>(
    &'a self,
    query: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Place>>> + Send + 'a;
}

/// Uploads image binaries to an external host.
pub trait ImageHost: Send + Sync {
  /// Upload `image` and return its stable, publicly reachable URI.
  fn upload(
    &self,
    image: ImageUpload,
  ) -> impl Future<Output = Result<String>> + Send + '_;
}
