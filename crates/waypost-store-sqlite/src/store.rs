//! [`SqliteStore`] — the SQLite implementation of [`MapStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use waypost_core::{
  marker::{Marker, NewMarker},
  principal::{Principal, VerifiedIdentity},
  review::{NewReview, Review, ReviewChanges},
  store::MapStore,
  visit::{NewVisit, Visit},
};

use crate::{
  Error, Result,
  encode::{
    RawMarker, RawPrincipal, RawReview, RawVisit, encode_dt, encode_images,
    encode_uuid,
  },
  schema::SCHEMA,
};

const PRINCIPAL_COLS: &str =
  "principal_id, email, name, avatar_uri, created_at, last_login";

const MARKER_COLS: &str =
  "marker_id, owner_email, location_name, latitude, longitude, image_uri, created_at";

const REVIEW_COLS: &str = "review_id, establishment_name, address, latitude, longitude, \
   rating, images, author_email, author_name, credential, created_at, \
   credential_expires_at";

const VISIT_COLS: &str =
  "visit_id, visitor_email, visited_email, credential, visited_at";

// ─── Row readers ──────────────────────────────────────────────────────────────

fn read_principal(row: &rusqlite::Row) -> rusqlite::Result<RawPrincipal> {
  Ok(RawPrincipal {
    principal_id: row.get(0)?,
    email:        row.get(1)?,
    name:         row.get(2)?,
    avatar_uri:   row.get(3)?,
    created_at:   row.get(4)?,
    last_login:   row.get(5)?,
  })
}

fn read_marker(row: &rusqlite::Row) -> rusqlite::Result<RawMarker> {
  Ok(RawMarker {
    marker_id:     row.get(0)?,
    owner_email:   row.get(1)?,
    location_name: row.get(2)?,
    latitude:      row.get(3)?,
    longitude:     row.get(4)?,
    image_uri:     row.get(5)?,
    created_at:    row.get(6)?,
  })
}

fn read_review(row: &rusqlite::Row) -> rusqlite::Result<RawReview> {
  Ok(RawReview {
    review_id:             row.get(0)?,
    establishment_name:    row.get(1)?,
    address:               row.get(2)?,
    latitude:              row.get(3)?,
    longitude:             row.get(4)?,
    rating:                row.get(5)?,
    images:                row.get(6)?,
    author_email:          row.get(7)?,
    author_name:           row.get(8)?,
    credential:            row.get(9)?,
    created_at:            row.get(10)?,
    credential_expires_at: row.get(11)?,
  })
}

fn read_visit(row: &rusqlite::Row) -> rusqlite::Result<RawVisit> {
  Ok(RawVisit {
    visit_id:      row.get(0)?,
    visitor_email: row.get(1)?,
    visited_email: row.get(2)?,
    credential:    row.get(3)?,
    visited_at:    row.get(4)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Waypost map store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Look up a principal by its unique email.
  ///
  /// Not part of [`MapStore`] — the workflow never reads a principal
  /// outside the login path. Kept for inspection and tests.
  pub async fn find_principal(&self, email: &str) -> Result<Option<Principal>> {
    let email = email.to_owned();

    let raw: Option<RawPrincipal> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PRINCIPAL_COLS} FROM principals WHERE email = ?1"),
              rusqlite::params![email],
              read_principal,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrincipal::into_principal).transpose()
  }
}

// ─── MapStore impl ───────────────────────────────────────────────────────────

impl MapStore for SqliteStore {
  type Error = Error;

  // ── Principals ──────────────────────────────────────────────────────────

  async fn refresh_principal(
    &self,
    identity: &VerifiedIdentity,
  ) -> Result<Option<Principal>> {
    let email      = identity.email.clone();
    let name       = identity.name.clone();
    let avatar_uri = identity.avatar_uri.clone();
    let now_str    = encode_dt(Utc::now());

    // A single UPDATE … RETURNING keeps the refresh atomic; created_at
    // and email are not in the SET list and therefore never change.
    let raw: Option<RawPrincipal> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE principals
                 SET name = ?1, avatar_uri = ?2, last_login = ?3
                 WHERE email = ?4
                 RETURNING {PRINCIPAL_COLS}"
              ),
              rusqlite::params![name, avatar_uri, now_str, email],
              read_principal,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrincipal::into_principal).transpose()
  }

  async fn create_principal(&self, identity: &VerifiedIdentity) -> Result<Principal> {
    let now = Utc::now();
    let principal = Principal {
      id:         Uuid::new_v4(),
      email:      identity.email.clone(),
      name:       identity.name.clone(),
      avatar_uri: identity.avatar_uri.clone(),
      created_at: now,
      last_login: now,
    };

    let id_str     = encode_uuid(principal.id);
    let email      = principal.email.clone();
    let name       = principal.name.clone();
    let avatar_uri = principal.avatar_uri.clone();
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO principals (principal_id, email, name, avatar_uri, created_at, last_login)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, email, name, avatar_uri, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(principal)
  }

  // ── Markers ─────────────────────────────────────────────────────────────

  async fn list_markers(&self, owner_email: &str) -> Result<Vec<Marker>> {
    let owner_email = owner_email.to_owned();

    let raws: Vec<RawMarker> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MARKER_COLS} FROM markers WHERE owner_email = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_email], read_marker)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMarker::into_marker).collect()
  }

  async fn insert_marker(&self, input: NewMarker) -> Result<Marker> {
    let marker = Marker {
      id:            Uuid::new_v4(),
      owner_email:   input.owner_email,
      location_name: input.location_name,
      latitude:      input.latitude,
      longitude:     input.longitude,
      image_uri:     input.image_uri,
      created_at:    Utc::now(),
    };

    let id_str        = encode_uuid(marker.id);
    let owner_email   = marker.owner_email.clone();
    let location_name = marker.location_name.clone();
    let latitude      = marker.latitude;
    let longitude     = marker.longitude;
    let image_uri     = marker.image_uri.clone();
    let at_str        = encode_dt(marker.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO markers (marker_id, owner_email, location_name, latitude, longitude, image_uri, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            owner_email,
            location_name,
            latitude,
            longitude,
            image_uri,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(marker)
  }

  // ── Reviews ─────────────────────────────────────────────────────────────

  async fn list_reviews(&self) -> Result<Vec<Review>> {
    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!("SELECT {REVIEW_COLS} FROM reviews"))?;
        let rows = stmt
          .query_map([], read_review)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_review).collect()
  }

  async fn list_reviews_by_author(&self, author_email: &str) -> Result<Vec<Review>> {
    let author_email = author_email.to_owned();

    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLS} FROM reviews WHERE author_email = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![author_email], read_review)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_review).collect()
  }

  async fn get_review(&self, id: Uuid) -> Result<Option<Review>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REVIEW_COLS} FROM reviews WHERE review_id = ?1"),
              rusqlite::params![id_str],
              read_review,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReview::into_review).transpose()
  }

  async fn insert_review(&self, input: NewReview) -> Result<Review> {
    let created_at = Utc::now();
    let review = Review {
      id: Uuid::new_v4(),
      establishment_name: input.establishment_name,
      address: input.address,
      latitude: input.latitude,
      longitude: input.longitude,
      rating: input.rating,
      images: input.images,
      author_email: input.author_email,
      author_name: input.author_name,
      credential: input.credential,
      created_at,
      // Fixed heuristic: the authoring credential is treated as expired
      // one hour after creation. Audit field only.
      credential_expires_at: created_at + chrono::Duration::hours(1),
    };

    let id_str             = encode_uuid(review.id);
    let establishment_name = review.establishment_name.clone();
    let address            = review.address.clone();
    let latitude           = review.latitude;
    let longitude          = review.longitude;
    let rating             = i64::from(review.rating);
    let images_str         = encode_images(&review.images)?;
    let author_email       = review.author_email.clone();
    let author_name        = review.author_name.clone();
    let credential         = review.credential.clone();
    let created_str        = encode_dt(review.created_at);
    let expires_str        = encode_dt(review.credential_expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reviews (
             review_id, establishment_name, address, latitude, longitude,
             rating, images, author_email, author_name, credential,
             created_at, credential_expires_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str,
            establishment_name,
            address,
            latitude,
            longitude,
            rating,
            images_str,
            author_email,
            author_name,
            credential,
            created_str,
            expires_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(review)
  }

  async fn update_review(
    &self,
    id: Uuid,
    changes: ReviewChanges,
  ) -> Result<Option<Review>> {
    let id_str             = encode_uuid(id);
    let establishment_name = changes.establishment_name;
    let address            = changes.address;
    let latitude           = changes.latitude;
    let longitude          = changes.longitude;
    let rating             = changes.rating.map(i64::from);

    // COALESCE keeps absent fields at their stored values inside one
    // atomic statement — the single-document find-and-update the
    // concurrency model relies on.
    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE reviews
                 SET establishment_name = COALESCE(?1, establishment_name),
                     address            = COALESCE(?2, address),
                     latitude           = COALESCE(?3, latitude),
                     longitude          = COALESCE(?4, longitude),
                     rating             = COALESCE(?5, rating)
                 WHERE review_id = ?6
                 RETURNING {REVIEW_COLS}"
              ),
              rusqlite::params![
                establishment_name,
                address,
                latitude,
                longitude,
                rating,
                id_str,
              ],
              read_review,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReview::into_review).transpose()
  }

  async fn delete_review(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM reviews WHERE review_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Visits — append-only ────────────────────────────────────────────────

  async fn insert_visit(&self, input: NewVisit) -> Result<Visit> {
    let visit = Visit {
      id:            Uuid::new_v4(),
      visitor_email: input.visitor_email,
      visited_email: input.visited_email,
      credential:    input.credential,
      visited_at:    Utc::now(),
    };

    let id_str        = encode_uuid(visit.id);
    let visitor_email = visit.visitor_email.clone();
    let visited_email = visit.visited_email.clone();
    let credential    = visit.credential.clone();
    let at_str        = encode_dt(visit.visited_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO visits (visit_id, visitor_email, visited_email, credential, visited_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, visitor_email, visited_email, credential, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(visit)
  }

  async fn visits_received(
    &self,
    visited_email: &str,
    limit: usize,
  ) -> Result<Vec<Visit>> {
    let visited_email = visited_email.to_owned();
    let limit_val     = limit as i64;

    let raws: Vec<RawVisit> = self
      .conn
      .call(move |conn| {
        // rowid breaks ties between same-instant writes.
        let mut stmt = conn.prepare(&format!(
          "SELECT {VISIT_COLS} FROM visits
           WHERE visited_email = ?1
           ORDER BY visited_at DESC, rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![visited_email, limit_val], read_visit)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisit::into_visit).collect()
  }
}
