//! Integration tests for `SqliteStore` against an in-memory database.

use uuid::Uuid;
use waypost_core::{
  marker::NewMarker,
  principal::VerifiedIdentity,
  review::{NewReview, ReviewChanges},
  store::MapStore,
  visit::NewVisit,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn identity(email: &str, name: &str) -> VerifiedIdentity {
  VerifiedIdentity {
    email:      email.to_owned(),
    name:       Some(name.to_owned()),
    avatar_uri: Some("https://avatars/a.png".to_owned()),
    subject_id: "sub-1".to_owned(),
  }
}

fn marker_input(owner: &str, location: &str) -> NewMarker {
  NewMarker {
    owner_email:   owner.to_owned(),
    location_name: location.to_owned(),
    latitude:      48.8584,
    longitude:     2.2945,
    image_uri:     "https://img/x.png".to_owned(),
  }
}

fn review_input(author: &str) -> NewReview {
  NewReview {
    establishment_name: "Casa Lola".to_owned(),
    address:            "Calle Granada 46, Malaga".to_owned(),
    latitude:           36.722,
    longitude:          -4.419,
    rating:             4,
    images:             vec!["https://img/1.png".to_owned()],
    author_email:       author.to_owned(),
    author_name:        "Author".to_owned(),
    credential:         "tok-author".to_owned(),
  }
}

fn visit_input(visitor: &str, visited: &str) -> NewVisit {
  NewVisit {
    visitor_email: visitor.to_owned(),
    visited_email: visited.to_owned(),
    credential:    "tok-visitor".to_owned(),
  }
}

// ─── Principals ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_principal() {
  let s = store().await;

  let created = s.create_principal(&identity("a@example.com", "Alice")).await.unwrap();
  assert_eq!(created.created_at, created.last_login);

  let found = s.find_principal("a@example.com").await.unwrap().unwrap();
  assert_eq!(found.id, created.id);
  assert_eq!(found.name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn find_principal_missing_returns_none() {
  let s = store().await;
  assert!(s.find_principal("ghost@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_principal_updates_profile_but_not_created_at() {
  let s = store().await;
  let created = s.create_principal(&identity("a@example.com", "Alice")).await.unwrap();

  let refreshed = s
    .refresh_principal(&identity("a@example.com", "Alice Liddell"))
    .await
    .unwrap()
    .unwrap();

  assert_eq!(refreshed.id, created.id);
  assert_eq!(refreshed.created_at, created.created_at);
  assert_eq!(refreshed.name.as_deref(), Some("Alice Liddell"));
  assert!(refreshed.last_login >= created.last_login);
}

#[tokio::test]
async fn refresh_unknown_principal_returns_none() {
  let s = store().await;
  let result = s
    .refresh_principal(&identity("ghost@example.com", "Ghost"))
    .await
    .unwrap();
  assert!(result.is_none());
}

// ─── Markers ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_list_markers_scoped_by_owner() {
  let s = store().await;

  let eiffel = s.insert_marker(marker_input("a@example.com", "Eiffel Tower")).await.unwrap();
  s.insert_marker(marker_input("a@example.com", "Louvre")).await.unwrap();
  s.insert_marker(marker_input("b@example.com", "Alhambra")).await.unwrap();

  let mine = s.list_markers("a@example.com").await.unwrap();
  assert_eq!(mine.len(), 2);
  assert_eq!(mine[0].id, eiffel.id);
  assert_eq!(mine[0].latitude, 48.8584);
  assert_eq!(mine[0].longitude, 2.2945);
  assert_eq!(mine[0].image_uri, "https://img/x.png");

  assert_eq!(s.list_markers("b@example.com").await.unwrap().len(), 1);
  assert!(s.list_markers("c@example.com").await.unwrap().is_empty());
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_review_stamps_expiry_one_hour_after_creation() {
  let s = store().await;
  let review = s.insert_review(review_input("a@example.com")).await.unwrap();

  assert_eq!(
    review.credential_expires_at - review.created_at,
    chrono::Duration::hours(1)
  );

  let fetched = s.get_review(review.id).await.unwrap().unwrap();
  assert_eq!(fetched.credential_expires_at, review.credential_expires_at);
  assert_eq!(fetched.images, vec!["https://img/1.png".to_owned()]);
}

#[tokio::test]
async fn get_review_missing_returns_none() {
  let s = store().await;
  assert!(s.get_review(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_reviews_by_author_filters() {
  let s = store().await;
  s.insert_review(review_input("a@example.com")).await.unwrap();
  s.insert_review(review_input("a@example.com")).await.unwrap();
  s.insert_review(review_input("b@example.com")).await.unwrap();

  assert_eq!(s.list_reviews().await.unwrap().len(), 3);

  let theirs = s.list_reviews_by_author("a@example.com").await.unwrap();
  assert_eq!(theirs.len(), 2);
  assert!(theirs.iter().all(|r| r.author_email == "a@example.com"));
}

#[tokio::test]
async fn update_review_applies_only_set_fields() {
  let s = store().await;
  let review = s.insert_review(review_input("a@example.com")).await.unwrap();

  let updated = s
    .update_review(review.id, ReviewChanges {
      rating: Some(5),
      ..ReviewChanges::default()
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.rating, 5);
  assert_eq!(updated.establishment_name, review.establishment_name);
  assert_eq!(updated.address, review.address);
  assert_eq!(updated.author_email, review.author_email);
}

#[tokio::test]
async fn update_review_with_address_and_coordinates() {
  let s = store().await;
  let review = s.insert_review(review_input("a@example.com")).await.unwrap();

  let updated = s
    .update_review(review.id, ReviewChanges {
      address:   Some("Champ de Mars, Paris".to_owned()),
      latitude:  Some(48.8584),
      longitude: Some(2.2945),
      ..ReviewChanges::default()
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.address, "Champ de Mars, Paris");
  assert_eq!(updated.latitude, 48.8584);
  assert_eq!(updated.longitude, 2.2945);
  assert_eq!(updated.rating, review.rating);
}

#[tokio::test]
async fn update_unknown_review_returns_none() {
  let s = store().await;
  let result = s
    .update_review(Uuid::new_v4(), ReviewChanges {
      rating: Some(3),
      ..ReviewChanges::default()
    })
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn delete_review_roundtrip() {
  let s = store().await;
  let review = s.insert_review(review_input("a@example.com")).await.unwrap();

  assert!(s.delete_review(review.id).await.unwrap());
  assert!(s.get_review(review.id).await.unwrap().is_none());
  assert!(!s.delete_review(review.id).await.unwrap());
}

// ─── Visits ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn visits_received_filters_by_visited_email() {
  let s = store().await;
  s.insert_visit(visit_input("a@example.com", "b@example.com")).await.unwrap();
  s.insert_visit(visit_input("c@example.com", "b@example.com")).await.unwrap();
  s.insert_visit(visit_input("a@example.com", "c@example.com")).await.unwrap();

  let received = s.visits_received("b@example.com", 100).await.unwrap();
  assert_eq!(received.len(), 2);
  assert!(received.iter().all(|v| v.visited_email == "b@example.com"));
}

#[tokio::test]
async fn visits_received_is_newest_first_and_capped() {
  let s = store().await;
  for i in 0..105 {
    s.insert_visit(visit_input(&format!("v{i}@example.com"), "host@example.com"))
      .await
      .unwrap();
  }

  let received = s.visits_received("host@example.com", 100).await.unwrap();
  assert_eq!(received.len(), 100);
  assert_eq!(received[0].visitor_email, "v104@example.com");
  assert_eq!(received[99].visitor_email, "v5@example.com");

  for pair in received.windows(2) {
    assert!(pair[0].visited_at >= pair[1].visited_at);
  }
}

#[tokio::test]
async fn duplicate_visits_are_not_deduplicated() {
  let s = store().await;
  for _ in 0..3 {
    s.insert_visit(visit_input("a@example.com", "b@example.com")).await.unwrap();
  }
  let received = s.visits_received("b@example.com", 100).await.unwrap();
  assert_eq!(received.len(), 3);
}
