//! Review — an establishment rating authored by a principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Ratings are integers in `0..=MAX_RATING`.
pub const MAX_RATING: u8 = 5;

/// Validate a raw rating into the accepted range.
///
/// Called before any external collaborator is contacted, so an
/// out-of-range rating never costs a geocoding or upload call.
pub fn validate_rating(raw: i64) -> Result<u8> {
  if (0..=i64::from(MAX_RATING)).contains(&raw) {
    Ok(raw as u8)
  } else {
    Err(Error::InvalidRating(raw))
  }
}

/// A persisted review. `author_email` is immutable after creation;
/// mutation by any other principal is rejected with
/// [`Error::Forbidden`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub id:                 Uuid,
  pub establishment_name: String,
  pub address:            String,
  pub latitude:           f64,
  pub longitude:          f64,
  pub rating:             u8,
  pub images:             Vec<String>,
  pub author_email:       String,
  pub author_name:        String,
  /// The literal bearer credential presented at creation.
  pub credential:         String,
  pub created_at:         DateTime<Utc>,
  /// Fixed heuristic: one hour after creation. An inert audit field —
  /// nothing ever validates against it.
  pub credential_expires_at: DateTime<Utc>,
}

/// Input for review creation. The store assigns `id`, `created_at` and
/// `credential_expires_at`.
#[derive(Debug, Clone)]
pub struct NewReview {
  pub establishment_name: String,
  pub address:            String,
  pub latitude:           f64,
  pub longitude:          f64,
  pub rating:             u8,
  pub images:             Vec<String>,
  pub author_email:       String,
  pub author_name:        String,
  pub credential:         String,
}

/// A partial update as submitted by the author, before any geocoding
/// decision has been made. `None` means "field not supplied".
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
  pub establishment_name: Option<String>,
  pub address:            Option<String>,
  pub rating:             Option<i64>,
}

/// Field-level changes applied by
/// [`MapStore::update_review`](crate::store::MapStore::update_review).
///
/// Coordinates travel alongside the address they were geocoded from.
/// Authorship fields are deliberately absent: they are immutable.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
  pub establishment_name: Option<String>,
  pub address:            Option<String>,
  pub latitude:           Option<f64>,
  pub longitude:          Option<f64>,
  pub rating:             Option<u8>,
}

impl ReviewChanges {
  /// True when no field is set; an empty change set must not touch
  /// storage.
  pub fn is_empty(&self) -> bool {
    self.establishment_name.is_none()
      && self.address.is_none()
      && self.latitude.is_none()
      && self.longitude.is_none()
      && self.rating.is_none()
  }
}
