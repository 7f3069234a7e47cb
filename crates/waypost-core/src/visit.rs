//! Visit — a one-way, append-only record that one principal viewed
//! another principal's markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on the visit history returned to a principal.
pub const RECEIVED_VISITS_CAP: usize = 100;

/// An attribution record. Never updated or deleted; multiple records
/// for the same (visitor, visited) pair are expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
  pub id:            Uuid,
  pub visitor_email: String,
  pub visited_email: String,
  /// The literal bearer credential the visitor presented.
  pub credential:    String,
  pub visited_at:    DateTime<Utc>,
}

/// Input for visit recording. The store assigns `id` and `visited_at`.
#[derive(Debug, Clone)]
pub struct NewVisit {
  pub visitor_email: String,
  pub visited_email: String,
  pub credential:    String,
}
