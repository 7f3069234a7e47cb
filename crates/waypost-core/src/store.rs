//! The `MapStore` trait — persistence abstraction for principals,
//! markers, reviews and visits.
//!
//! The trait is implemented by storage backends (e.g.
//! `waypost-store-sqlite`). Higher layers depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  marker::{Marker, NewMarker},
  principal::{Principal, VerifiedIdentity},
  review::{NewReview, Review, ReviewChanges},
  visit::{NewVisit, Visit},
};

/// Abstraction over a Waypost persistence backend.
///
/// Stores assign ids and server-side timestamps on insert. Consistency
/// for concurrent writers is the backend's problem: `refresh_principal`
/// and `update_review` must be single-document atomic updates.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MapStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Principals ────────────────────────────────────────────────────────

  /// Atomically refresh `name`, `avatar_uri` and `last_login` for an
  /// existing principal, leaving `created_at` and `email` untouched.
  ///
  /// Returns `None` when no principal has this email.
  fn refresh_principal<'a>(
    &'a self,
    identity: &'a VerifiedIdentity,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + 'a;

  /// Create and persist a principal for a never-seen email, with
  /// `created_at` and `last_login` both set to now.
  fn create_principal<'a>(
    &'a self,
    identity: &'a VerifiedIdentity,
  ) -> impl Future<Output = Result<Principal, Self::Error>> + Send + 'a;

  // ── Markers ───────────────────────────────────────────────────────────

  /// All markers owned by `owner_email`, in storage order.
  fn list_markers<'a>(
    &'a self,
    owner_email: &'a str,
  ) -> impl Future<Output = Result<Vec<Marker>, Self::Error>> + Send + 'a;

  /// Persist a new marker; the store sets `id` and `created_at`.
  fn insert_marker(
    &self,
    input: NewMarker,
  ) -> impl Future<Output = Result<Marker, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// The full review collection, in storage order.
  fn list_reviews(
    &self,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  fn list_reviews_by_author<'a>(
    &'a self,
    author_email: &'a str,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + 'a;

  fn get_review(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// Persist a new review; the store sets `id`, `created_at`, and
  /// `credential_expires_at` (one hour after `created_at`).
  fn insert_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Apply `changes` to a review as one atomic update and return the
  /// updated record, or `None` if `id` is unknown.
  ///
  /// Callers must not pass an empty change set.
  fn update_review(
    &self,
    id: Uuid,
    changes: ReviewChanges,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// Remove a review. Returns `false` if `id` is unknown.
  fn delete_review(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Visits — append-only ──────────────────────────────────────────────

  /// Persist a new visit; the store sets `id` and `visited_at`.
  fn insert_visit(
    &self,
    input: NewVisit,
  ) -> impl Future<Output = Result<Visit, Self::Error>> + Send + '_;

  /// Visits received by `visited_email`, newest first, at most `limit`.
  fn visits_received<'a>(
    &'a self,
    visited_email: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Visit>, Self::Error>> + Send + 'a;
}
