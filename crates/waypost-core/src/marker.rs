//! Marker — a geo-tagged point on a principal's personal map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A placed marker. Immutable after creation — no update or delete
/// operation exists for markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
  pub id:            Uuid,
  pub owner_email:   String,
  pub location_name: String,
  pub latitude:      f64,
  pub longitude:     f64,
  pub image_uri:     String,
  pub created_at:    DateTime<Utc>,
}

/// Input for marker creation. Coordinates come from the geocoder, the
/// image URI from the image host; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone)]
pub struct NewMarker {
  pub owner_email:   String,
  pub location_name: String,
  pub latitude:      f64,
  pub longitude:     f64,
  pub image_uri:     String,
}
