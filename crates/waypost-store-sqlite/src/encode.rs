//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Review image lists
//! are stored as compact JSON arrays. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use waypost_core::{
  marker::Marker, principal::Principal, review::Review, visit::Visit,
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Image URI lists ──────────────────────────────────────────────────────────

pub fn encode_images(images: &[String]) -> Result<String> {
  Ok(serde_json::to_string(images)?)
}

pub fn decode_images(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `principals` row.
pub struct RawPrincipal {
  pub principal_id: String,
  pub email:        String,
  pub name:         Option<String>,
  pub avatar_uri:   Option<String>,
  pub created_at:   String,
  pub last_login:   String,
}

impl RawPrincipal {
  pub fn into_principal(self) -> Result<Principal> {
    Ok(Principal {
      id:         decode_uuid(&self.principal_id)?,
      email:      self.email,
      name:       self.name,
      avatar_uri: self.avatar_uri,
      created_at: decode_dt(&self.created_at)?,
      last_login: decode_dt(&self.last_login)?,
    })
  }
}

/// Raw values read directly from a `markers` row.
pub struct RawMarker {
  pub marker_id:     String,
  pub owner_email:   String,
  pub location_name: String,
  pub latitude:      f64,
  pub longitude:     f64,
  pub image_uri:     String,
  pub created_at:    String,
}

impl RawMarker {
  pub fn into_marker(self) -> Result<Marker> {
    Ok(Marker {
      id:            decode_uuid(&self.marker_id)?,
      owner_email:   self.owner_email,
      location_name: self.location_name,
      latitude:      self.latitude,
      longitude:     self.longitude,
      image_uri:     self.image_uri,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:             String,
  pub establishment_name:    String,
  pub address:               String,
  pub latitude:              f64,
  pub longitude:             f64,
  pub rating:                i64,
  pub images:                String,
  pub author_email:          String,
  pub author_name:           String,
  pub credential:            String,
  pub created_at:            String,
  pub credential_expires_at: String,
}

impl RawReview {
  pub fn into_review(self) -> Result<Review> {
    let rating = u8::try_from(self.rating)
      .map_err(|_| Error::Decode(format!("rating out of range: {}", self.rating)))?;

    Ok(Review {
      id: decode_uuid(&self.review_id)?,
      establishment_name: self.establishment_name,
      address: self.address,
      latitude: self.latitude,
      longitude: self.longitude,
      rating,
      images: decode_images(&self.images)?,
      author_email: self.author_email,
      author_name: self.author_name,
      credential: self.credential,
      created_at: decode_dt(&self.created_at)?,
      credential_expires_at: decode_dt(&self.credential_expires_at)?,
    })
  }
}

/// Raw strings read directly from a `visits` row.
pub struct RawVisit {
  pub visit_id:      String,
  pub visitor_email: String,
  pub visited_email: String,
  pub credential:    String,
  pub visited_at:    String,
}

impl RawVisit {
  pub fn into_visit(self) -> Result<Visit> {
    Ok(Visit {
      id:            decode_uuid(&self.visit_id)?,
      visitor_email: self.visitor_email,
      visited_email: self.visited_email,
      credential:    self.credential,
      visited_at:    decode_dt(&self.visited_at)?,
    })
  }
}
