//! Handlers for `/v1/maps/markers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/v1/maps/markers` | Caller's own markers |
//! | `GET`  | `/v1/maps/markers/:email` | Target's markers; records a visit |
//! | `POST` | `/v1/maps/markers` | Multipart: `location_name`, `image` |

use axum::{
  Json,
  extract::{Multipart, Path, State},
};
use waypost_core::{
  external::{Geocoder, ImageHost, ImageUpload, TokenVerifier},
  marker::Marker,
  store::MapStore,
  workflow,
};

use crate::{AppState, Caller, error::ApiError};

// ─── List mine ────────────────────────────────────────────────────────────────

/// `GET /v1/maps/markers` — the caller's own markers. Never records a
/// visit.
pub async fn list_mine<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  caller: Caller,
) -> Result<Json<Vec<Marker>>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let markers = workflow::my_markers(state.store.as_ref(), caller.email()).await?;
  Ok(Json(markers))
}

// ─── List another principal's ─────────────────────────────────────────────────

/// `GET /v1/maps/markers/:email` — another principal's markers.
///
/// Records a visit attributed to the caller before the read; the visit
/// write failing fails the whole request.
pub async fn list_of<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  Path(target_email): Path<String>,
  caller: Caller,
) -> Result<Json<Vec<Marker>>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let markers = workflow::markers_of(
    state.store.as_ref(),
    &target_email,
    caller.email(),
    &caller.credential,
  )
  .await?;
  Ok(Json(markers))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /v1/maps/markers` — multipart: `location_name` (text), `image`
/// (file).
pub async fn create<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  caller: Caller,
  mut multipart: Multipart,
) -> Result<Json<Marker>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let mut location_name: Option<String> = None;
  let mut image: Option<ImageUpload> = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.to_string()))?
  {
    match field.name().unwrap_or_default() {
      "location_name" => {
        location_name = Some(
          field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        );
      }
      "image" => {
        let filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
          .bytes()
          .await
          .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        image = Some(ImageUpload { filename, content_type, bytes });
      }
      _ => {}
    }
  }

  let location_name = location_name
    .ok_or_else(|| ApiError::BadRequest("missing field: location_name".into()))?;
  let image =
    image.ok_or_else(|| ApiError::BadRequest("missing field: image".into()))?;

  let marker = workflow::create_marker(
    state.store.as_ref(),
    state.geocoder.as_ref(),
    state.images.as_ref(),
    caller.email(),
    &location_name,
    image,
  )
  .await?;

  Ok(Json(marker))
}
