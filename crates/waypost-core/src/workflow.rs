//! The request-authorization and visit-attribution workflow.
//!
//! Handlers delegate here. These functions own the rules that define
//! the system: resolve-or-create on login, one-way visit attribution
//! with self-visit suppression, author-only review mutation, and
//! re-geocoding only when an address actually changes.

use uuid::Uuid;

use crate::{
  error::{Error, Result},
  external::{Geocoder, ImageHost, ImageUpload, TokenVerifier},
  marker::{Marker, NewMarker},
  principal::{Principal, VerifiedIdentity},
  review::{NewReview, Review, ReviewChanges, ReviewPatch, validate_rating},
  store::MapStore,
  visit::{NewVisit, RECEIVED_VISITS_CAP, Visit},
};

// ─── Login ────────────────────────────────────────────────────────────────────

/// Verify `token` and resolve it to a persisted principal.
///
/// Verification failure rejects the request before any store access, so
/// a bad token never creates or updates a principal row.
pub async fn login<S, V>(store: &S, verifier: &V, token: &str) -> Result<Principal>
where
  S: MapStore,
  V: TokenVerifier,
{
  let identity = verifier.verify(token).await?;
  resolve_or_create(store, &identity).await
}

/// Map a verified identity to a principal record.
///
/// Existing principals get `name`, `avatar_uri` and `last_login`
/// refreshed; `created_at` and `email` are never touched. A never-seen
/// email gets a fresh record. This runs only on the explicit login path
/// — resource handlers work from the verified identity alone.
pub async fn resolve_or_create<S: MapStore>(
  store: &S,
  identity: &VerifiedIdentity,
) -> Result<Principal> {
  if let Some(principal) = store
    .refresh_principal(identity)
    .await
    .map_err(Error::store)?
  {
    return Ok(principal);
  }
  store.create_principal(identity).await.map_err(Error::store)
}

// ─── Visit attribution ────────────────────────────────────────────────────────

/// Record that `visitor_email` viewed `visited_email`'s markers.
///
/// A principal viewing their own resources is not a visit: self-visits
/// return `Ok(None)` without touching storage. Otherwise every call
/// appends a fresh record — no deduplication. A failed write is fatal
/// to the enclosing access; visit attribution is a functional
/// requirement, not telemetry.
pub async fn record_visit<S: MapStore>(
  store: &S,
  visitor_email: &str,
  visited_email: &str,
  credential: &str,
) -> Result<Option<Visit>> {
  if visitor_email == visited_email {
    return Ok(None);
  }

  let visit = store
    .insert_visit(NewVisit {
      visitor_email: visitor_email.to_owned(),
      visited_email: visited_email.to_owned(),
      credential:    credential.to_owned(),
    })
    .await
    .map_err(Error::store)?;

  Ok(Some(visit))
}

/// Visits received by `email`, newest first, capped at
/// [`RECEIVED_VISITS_CAP`].
pub async fn visits_received<S: MapStore>(store: &S, email: &str) -> Result<Vec<Visit>> {
  store
    .visits_received(email, RECEIVED_VISITS_CAP)
    .await
    .map_err(Error::store)
}

// ─── Markers ──────────────────────────────────────────────────────────────────

/// The caller's own markers. Never records a visit.
pub async fn my_markers<S: MapStore>(store: &S, owner_email: &str) -> Result<Vec<Marker>> {
  store.list_markers(owner_email).await.map_err(Error::store)
}

/// View another principal's markers, attributing the access first.
///
/// The visit write is a precondition: if it fails, the markers are not
/// returned.
pub async fn markers_of<S: MapStore>(
  store: &S,
  target_email: &str,
  caller_email: &str,
  caller_credential: &str,
) -> Result<Vec<Marker>> {
  record_visit(store, caller_email, target_email, caller_credential).await?;
  store.list_markers(target_email).await.map_err(Error::store)
}

/// Create a marker from a free-text place name and an image.
///
/// Geocoding and upload are prerequisites; the marker is persisted only
/// after both succeed. There is no compensating deletion if persistence
/// fails after a successful upload.
pub async fn create_marker<S, G, I>(
  store: &S,
  geocoder: &G,
  images: &I,
  owner_email: &str,
  location_name: &str,
  image: ImageUpload,
) -> Result<Marker>
where
  S: MapStore,
  G: Geocoder,
  I: ImageHost,
{
  let (latitude, longitude) = geocoder.coordinates(location_name).await?;
  let image_uri = images.upload(image).await?;

  store
    .insert_marker(NewMarker {
      owner_email: owner_email.to_owned(),
      location_name: location_name.to_owned(),
      latitude,
      longitude,
      image_uri,
    })
    .await
    .map_err(Error::store)
}

// ─── Reviews ──────────────────────────────────────────────────────────────────

/// Create a review, geocoding its address and uploading any attached
/// images.
///
/// The rating is validated first so an out-of-range value costs no
/// external call.
pub async fn create_review<S, G, I>(
  store: &S,
  geocoder: &G,
  images: &I,
  identity: &VerifiedIdentity,
  credential: &str,
  establishment_name: String,
  address: String,
  rating: i64,
  attachments: Vec<ImageUpload>,
) -> Result<Review>
where
  S: MapStore,
  G: Geocoder,
  I: ImageHost,
{
  let rating = validate_rating(rating)?;
  let (latitude, longitude) = geocoder.coordinates(&address).await?;

  let mut image_uris = Vec::with_capacity(attachments.len());
  for attachment in attachments {
    image_uris.push(images.upload(attachment).await?);
  }

  store
    .insert_review(NewReview {
      establishment_name,
      address,
      latitude,
      longitude,
      rating,
      images: image_uris,
      author_email: identity.email.clone(),
      author_name: identity.name.clone().unwrap_or_default(),
      credential: credential.to_owned(),
    })
    .await
    .map_err(Error::store)
}

/// Apply a partial update to a review.
///
/// Only the author may update. An address identical to the stored one
/// does not trigger a geocoding call; an empty patch returns the stored
/// record without a persistence write.
pub async fn update_review<S, G>(
  store: &S,
  geocoder: &G,
  id: Uuid,
  caller_email: &str,
  patch: ReviewPatch,
) -> Result<Review>
where
  S: MapStore,
  G: Geocoder,
{
  let existing = store
    .get_review(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ReviewNotFound(id))?;

  if existing.author_email != caller_email {
    return Err(Error::Forbidden);
  }

  // Rating bound check happens before the (potential) geocoding call.
  let rating = patch.rating.map(validate_rating).transpose()?;

  let mut changes = ReviewChanges {
    establishment_name: patch.establishment_name,
    rating,
    ..ReviewChanges::default()
  };

  if let Some(address) = patch.address
    && address != existing.address
  {
    let (latitude, longitude) = geocoder.coordinates(&address).await?;
    changes.address = Some(address);
    changes.latitude = Some(latitude);
    changes.longitude = Some(longitude);
  }

  if changes.is_empty() {
    return Ok(existing);
  }

  store
    .update_review(id, changes)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ReviewNotFound(id))
}

/// Delete a review. Only the author may delete.
pub async fn delete_review<S: MapStore>(
  store: &S,
  id: Uuid,
  caller_email: &str,
) -> Result<()> {
  let existing = store
    .get_review(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ReviewNotFound(id))?;

  if existing.author_email != caller_email {
    return Err(Error::Forbidden);
  }

  if store.delete_review(id).await.map_err(Error::store)? {
    Ok(())
  } else {
    Err(Error::ReviewNotFound(id))
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use bytes::Bytes;
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::external::Place;

  // ── In-memory fakes ─────────────────────────────────────────────────────

  #[derive(Default)]
  struct MemoryStore {
    principals:    Mutex<Vec<Principal>>,
    markers:       Mutex<Vec<Marker>>,
    reviews:       Mutex<Vec<Review>>,
    visits:        Mutex<Vec<Visit>>,
    review_writes: AtomicUsize,
  }

  impl MapStore for MemoryStore {
    type Error = std::convert::Infallible;

    async fn refresh_principal(
      &self,
      identity: &VerifiedIdentity,
    ) -> Result<Option<Principal>, Self::Error> {
      let mut principals = self.principals.lock().unwrap();
      let Some(p) = principals.iter_mut().find(|p| p.email == identity.email) else {
        return Ok(None);
      };
      p.name = identity.name.clone();
      p.avatar_uri = identity.avatar_uri.clone();
      p.last_login = Utc::now();
      Ok(Some(p.clone()))
    }

    async fn create_principal(
      &self,
      identity: &VerifiedIdentity,
    ) -> Result<Principal, Self::Error> {
      let now = Utc::now();
      let principal = Principal {
        id:         Uuid::new_v4(),
        email:      identity.email.clone(),
        name:       identity.name.clone(),
        avatar_uri: identity.avatar_uri.clone(),
        created_at: now,
        last_login: now,
      };
      self.principals.lock().unwrap().push(principal.clone());
      Ok(principal)
    }

    async fn list_markers(&self, owner_email: &str) -> Result<Vec<Marker>, Self::Error> {
      Ok(
        self
          .markers
          .lock()
          .unwrap()
          .iter()
          .filter(|m| m.owner_email == owner_email)
          .cloned()
          .collect(),
      )
    }

    async fn insert_marker(&self, input: NewMarker) -> Result<Marker, Self::Error> {
      let marker = Marker {
        id:            Uuid::new_v4(),
        owner_email:   input.owner_email,
        location_name: input.location_name,
        latitude:      input.latitude,
        longitude:     input.longitude,
        image_uri:     input.image_uri,
        created_at:    Utc::now(),
      };
      self.markers.lock().unwrap().push(marker.clone());
      Ok(marker)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, Self::Error> {
      Ok(self.reviews.lock().unwrap().clone())
    }

    async fn list_reviews_by_author(
      &self,
      author_email: &str,
    ) -> Result<Vec<Review>, Self::Error> {
      Ok(
        self
          .reviews
          .lock()
          .unwrap()
          .iter()
          .filter(|r| r.author_email == author_email)
          .cloned()
          .collect(),
      )
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, Self::Error> {
      Ok(
        self
          .reviews
          .lock()
          .unwrap()
          .iter()
          .find(|r| r.id == id)
          .cloned(),
      )
    }

    async fn insert_review(&self, input: NewReview) -> Result<Review, Self::Error> {
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
        credential_expires_at: created_at + chrono::Duration::hours(1),
      };
      self.reviews.lock().unwrap().push(review.clone());
      Ok(review)
    }

    async fn update_review(
      &self,
      id: Uuid,
      changes: ReviewChanges,
    ) -> Result<Option<Review>, Self::Error> {
      self.review_writes.fetch_add(1, Ordering::SeqCst);
      let mut reviews = self.reviews.lock().unwrap();
      let Some(review) = reviews.iter_mut().find(|r| r.id == id) else {
        return Ok(None);
      };
      if let Some(v) = changes.establishment_name {
        review.establishment_name = v;
      }
      if let Some(v) = changes.address {
        review.address = v;
      }
      if let Some(v) = changes.latitude {
        review.latitude = v;
      }
      if let Some(v) = changes.longitude {
        review.longitude = v;
      }
      if let Some(v) = changes.rating {
        review.rating = v;
      }
      Ok(Some(review.clone()))
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, Self::Error> {
      let mut reviews = self.reviews.lock().unwrap();
      let before = reviews.len();
      reviews.retain(|r| r.id != id);
      Ok(reviews.len() < before)
    }

    async fn insert_visit(&self, input: NewVisit) -> Result<Visit, Self::Error> {
      let visit = Visit {
        id:            Uuid::new_v4(),
        visitor_email: input.visitor_email,
        visited_email: input.visited_email,
        credential:    input.credential,
        visited_at:    Utc::now(),
      };
      self.visits.lock().unwrap().push(visit.clone());
      Ok(visit)
    }

    async fn visits_received(
      &self,
      visited_email: &str,
      limit: usize,
    ) -> Result<Vec<Visit>, Self::Error> {
      // Insertion order doubles as chronological order here.
      Ok(
        self
          .visits
          .lock()
          .unwrap()
          .iter()
          .rev()
          .filter(|v| v.visited_email == visited_email)
          .take(limit)
          .cloned()
          .collect(),
      )
    }
  }

  #[derive(Default)]
  struct FakeGeocoder {
    calls: AtomicUsize,
  }

  impl Geocoder for FakeGeocoder {
    async fn coordinates(&self, query: &str) -> crate::Result<(f64, f64)> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if query == "nowhere" {
        return Err(Error::LocationNotFound(query.to_owned()));
      }
      Ok((48.8584, 2.2945))
    }

    async fn search(&self, _query: &str, _limit: usize) -> crate::Result<Vec<Place>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(vec![])
    }
  }

  #[derive(Default)]
  struct FakeImageHost {
    calls: AtomicUsize,
  }

  impl ImageHost for FakeImageHost {
    async fn upload(&self, _image: ImageUpload) -> crate::Result<String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok("https://img/x.png".to_owned())
    }
  }

  fn identity(email: &str, name: &str) -> VerifiedIdentity {
    VerifiedIdentity {
      email:      email.to_owned(),
      name:       Some(name.to_owned()),
      avatar_uri: Some(format!("https://avatars/{email}.png")),
      subject_id: format!("sub-{email}"),
    }
  }

  fn png() -> ImageUpload {
    ImageUpload {
      filename:     Some("x.png".to_owned()),
      content_type: Some("image/png".to_owned()),
      bytes:        Bytes::from_static(b"\x89PNG"),
    }
  }

  async fn seeded_review(store: &MemoryStore, author: &str) -> Review {
    let geocoder = FakeGeocoder::default();
    let images = FakeImageHost::default();
    create_review(
      store,
      &geocoder,
      &images,
      &identity(author, "Author"),
      "tok-author",
      "Casa Lola".to_owned(),
      "Calle Granada 46, Malaga".to_owned(),
      4,
      vec![png()],
    )
    .await
    .unwrap()
  }

  // ── Login ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn resolve_or_create_refreshes_without_touching_created_at() {
    let store = MemoryStore::default();

    let first = resolve_or_create(&store, &identity("a@example.com", "Alice"))
      .await
      .unwrap();

    let second = resolve_or_create(&store, &identity("a@example.com", "Alice L."))
      .await
      .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.name.as_deref(), Some("Alice L."));
    assert!(second.last_login >= first.last_login);
    assert_eq!(store.principals.lock().unwrap().len(), 1);
  }

  // ── Visit attribution ───────────────────────────────────────────────────

  #[tokio::test]
  async fn self_visit_is_never_recorded() {
    let store = MemoryStore::default();
    for _ in 0..3 {
      let visit = record_visit(&store, "a@example.com", "a@example.com", "tok")
        .await
        .unwrap();
      assert!(visit.is_none());
    }
    assert!(store.visits.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn each_foreign_read_appends_one_visit() {
    let store = MemoryStore::default();
    for _ in 0..3 {
      markers_of(&store, "b@example.com", "a@example.com", "tok-a")
        .await
        .unwrap();
    }
    let visits = store.visits.lock().unwrap();
    assert_eq!(visits.len(), 3);
    assert!(
      visits
        .iter()
        .all(|v| v.visitor_email == "a@example.com" && v.visited_email == "b@example.com")
    );
  }

  #[tokio::test]
  async fn own_marker_read_records_nothing() {
    let store = MemoryStore::default();
    markers_of(&store, "a@example.com", "a@example.com", "tok")
      .await
      .unwrap();
    assert!(store.visits.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn visits_received_is_capped_and_newest_first() {
    let store = MemoryStore::default();
    for i in 0..105 {
      record_visit(&store, &format!("v{i}@example.com"), "host@example.com", "tok")
        .await
        .unwrap();
    }

    let received = visits_received(&store, "host@example.com").await.unwrap();
    assert_eq!(received.len(), RECEIVED_VISITS_CAP);
    assert_eq!(received[0].visitor_email, "v104@example.com");
  }

  // ── Markers ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_marker_roundtrip() {
    let store = MemoryStore::default();
    let geocoder = FakeGeocoder::default();
    let images = FakeImageHost::default();

    let marker = create_marker(
      &store,
      &geocoder,
      &images,
      "a@example.com",
      "Eiffel Tower",
      png(),
    )
    .await
    .unwrap();

    assert_eq!(marker.latitude, 48.8584);
    assert_eq!(marker.longitude, 2.2945);
    assert_eq!(marker.image_uri, "https://img/x.png");

    let mine = my_markers(&store, "a@example.com").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, marker.id);
  }

  #[tokio::test]
  async fn create_marker_unknown_location_fails_before_upload() {
    let store = MemoryStore::default();
    let geocoder = FakeGeocoder::default();
    let images = FakeImageHost::default();

    let err = create_marker(&store, &geocoder, &images, "a@example.com", "nowhere", png())
      .await
      .unwrap_err();

    assert!(matches!(err, Error::LocationNotFound(_)));
    assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    assert!(store.markers.lock().unwrap().is_empty());
  }

  // ── Reviews ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn review_rating_out_of_range_rejected_before_external_calls() {
    let store = MemoryStore::default();
    let geocoder = FakeGeocoder::default();
    let images = FakeImageHost::default();

    for bad in [-1, 6] {
      let err = create_review(
        &store,
        &geocoder,
        &images,
        &identity("a@example.com", "Alice"),
        "tok",
        "Casa Lola".to_owned(),
        "Calle Granada 46".to_owned(),
        bad,
        vec![png()],
      )
      .await
      .unwrap_err();
      assert!(matches!(err, Error::InvalidRating(r) if r == bad));
    }

    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    assert!(store.reviews.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn update_by_non_author_is_forbidden_and_leaves_row_unchanged() {
    let store = MemoryStore::default();
    let review = seeded_review(&store, "author@example.com").await;
    let geocoder = FakeGeocoder::default();

    let patch = ReviewPatch {
      rating: Some(1),
      ..ReviewPatch::default()
    };
    let err = update_review(&store, &geocoder, review.id, "intruder@example.com", patch)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden));

    let stored = store.get_review(review.id).await.unwrap().unwrap();
    assert_eq!(stored.rating, review.rating);
  }

  #[tokio::test]
  async fn delete_by_non_author_is_forbidden() {
    let store = MemoryStore::default();
    let review = seeded_review(&store, "author@example.com").await;

    let err = delete_review(&store, review.id, "intruder@example.com")
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden));
    assert!(store.get_review(review.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn delete_by_author_removes_the_review() {
    let store = MemoryStore::default();
    let review = seeded_review(&store, "author@example.com").await;

    delete_review(&store, review.id, "author@example.com")
      .await
      .unwrap();
    assert!(store.get_review(review.id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn update_with_unchanged_address_skips_geocoder() {
    let store = MemoryStore::default();
    let review = seeded_review(&store, "author@example.com").await;
    let geocoder = FakeGeocoder::default();

    let patch = ReviewPatch {
      address: Some(review.address.clone()),
      rating: Some(5),
      ..ReviewPatch::default()
    };
    let updated = update_review(&store, &geocoder, review.id, "author@example.com", patch)
      .await
      .unwrap();

    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(updated.rating, 5);
    assert_eq!(updated.address, review.address);
  }

  #[tokio::test]
  async fn update_with_new_address_regeocodes() {
    let store = MemoryStore::default();
    let review = seeded_review(&store, "author@example.com").await;
    let geocoder = FakeGeocoder::default();

    let patch = ReviewPatch {
      address: Some("Champ de Mars, Paris".to_owned()),
      ..ReviewPatch::default()
    };
    let updated = update_review(&store, &geocoder, review.id, "author@example.com", patch)
      .await
      .unwrap();

    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(updated.address, "Champ de Mars, Paris");
    assert_eq!(updated.latitude, 48.8584);
    assert_eq!(updated.longitude, 2.2945);
  }

  #[tokio::test]
  async fn empty_patch_returns_stored_record_without_a_write() {
    let store = MemoryStore::default();
    let review = seeded_review(&store, "author@example.com").await;
    let geocoder = FakeGeocoder::default();

    let unchanged = update_review(
      &store,
      &geocoder,
      review.id,
      "author@example.com",
      ReviewPatch::default(),
    )
    .await
    .unwrap();

    assert_eq!(unchanged.id, review.id);
    assert_eq!(unchanged.rating, review.rating);
    assert_eq!(store.review_writes.load(Ordering::SeqCst), 0);
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn update_unknown_review_is_not_found() {
    let store = MemoryStore::default();
    let geocoder = FakeGeocoder::default();
    let err = update_review(
      &store,
      &geocoder,
      Uuid::new_v4(),
      "a@example.com",
      ReviewPatch::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::ReviewNotFound(_)));
  }
}
