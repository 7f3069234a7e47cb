//! Principal — an authenticated user, keyed by email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attributes extracted from a verified identity-provider credential.
///
/// An explicit value type rather than an open-ended attribute map:
/// every consumer reads the same four fields, statically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
  pub email:      String,
  pub name:       Option<String>,
  pub avatar_uri: Option<String>,
  /// The provider's stable subject id (`sub` claim).
  pub subject_id: String,
}

/// A persisted user record.
///
/// Created on first successful credential verification for a never-seen
/// email; `name`, `avatar_uri` and `last_login` are refreshed on every
/// subsequent login. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
  pub id:         Uuid,
  pub email:      String,
  pub name:       Option<String>,
  pub avatar_uri: Option<String>,
  pub created_at: DateTime<Utc>,
  pub last_login: DateTime<Utc>,
}
