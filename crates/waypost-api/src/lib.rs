//! JSON REST API for Waypost.
//!
//! Exposes an axum [`Router`] backed by any
//! [`waypost_core::store::MapStore`] and the three external
//! collaborators. TLS and transport concerns are the caller's
//! responsibility.

pub mod auth;
pub mod caller;
pub mod error;
pub mod geocoding;
pub mod markers;
pub mod reviews;
pub mod visits;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::get,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use waypost_core::{
  external::{Geocoder, ImageHost, TokenVerifier},
  store::MapStore,
};

pub use caller::Caller;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, V, G, I> {
  pub store:    Arc<S>,
  pub verifier: Arc<V>,
  pub geocoder: Arc<G>,
  pub images:   Arc<I>,
}

// Manual impl: `derive(Clone)` would require Clone on the type
// parameters, which the Arcs make unnecessary.
impl<S, V, G, I> Clone for AppState<S, V, G, I> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      verifier: self.verifier.clone(),
      geocoder: self.geocoder.clone(),
      images:   self.images.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for the given services.
pub fn router<S, V, G, I>(state: AppState<S, V, G, I>) -> Router
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  Router::new()
    .route("/", get(root))
    .route("/health", get(health))
    // Auth
    .route("/v1/auth/login", axum::routing::post(auth::login::<S, V, G, I>))
    // Markers
    .route(
      "/v1/maps/markers",
      get(markers::list_mine::<S, V, G, I>).post(markers::create::<S, V, G, I>),
    )
    .route("/v1/maps/markers/{email}", get(markers::list_of::<S, V, G, I>))
    // Reviews
    .route(
      "/v1/reviews/",
      get(reviews::list_all::<S, V, G, I>).post(reviews::create::<S, V, G, I>),
    )
    .route("/v1/reviews/mine", get(reviews::list_mine::<S, V, G, I>))
    .route(
      "/v1/reviews/{id}",
      get(reviews::get_one::<S, V, G, I>)
        .put(reviews::update::<S, V, G, I>)
        .delete(reviews::delete_one::<S, V, G, I>),
    )
    // Social
    .route("/v1/social/visits", get(visits::list_received::<S, V, G, I>))
    // Geocoding
    .route(
      "/v1/geocoding/autocomplete",
      get(geocoding::autocomplete::<S, V, G, I>),
    )
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}

// ─── Meta endpoints ───────────────────────────────────────────────────────────

/// `GET /` — service banner.
async fn root() -> Json<serde_json::Value> {
  Json(json!({
    "service": "waypost",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
  Json(json!({ "status": "healthy" }))
}
