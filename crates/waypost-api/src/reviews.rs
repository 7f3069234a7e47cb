//! Handlers for `/v1/reviews` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/v1/reviews/` | Public; full collection |
//! | `GET`    | `/v1/reviews/mine` | Caller's own reviews |
//! | `GET`    | `/v1/reviews/:id` | Public; 404 if unknown |
//! | `POST`   | `/v1/reviews/` | Multipart; 201 + stored review |
//! | `PUT`    | `/v1/reviews/:id` | Form, partial fields; author only |
//! | `DELETE` | `/v1/reviews/:id` | Author only |

use axum::{
  Json,
  extract::{Form, Multipart, Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use waypost_core::{
  Error as CoreError,
  external::{Geocoder, ImageHost, ImageUpload, TokenVerifier},
  review::{Review, ReviewPatch},
  store::MapStore,
  workflow,
};

use crate::{AppState, Caller, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /v1/reviews/` — unauthenticated, the full collection.
pub async fn list_all<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
) -> Result<Json<Vec<Review>>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let reviews = state.store.list_reviews().await.map_err(ApiError::store)?;
  Ok(Json(reviews))
}

/// `GET /v1/reviews/mine`
pub async fn list_mine<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  caller: Caller,
) -> Result<Json<Vec<Review>>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let reviews = state
    .store
    .list_reviews_by_author(caller.email())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reviews))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /v1/reviews/:id` — unauthenticated detail view.
pub async fn get_one<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Review>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let review = state
    .store
    .get_review(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::ReviewNotFound(id))?;
  Ok(Json(review))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /v1/reviews/` — multipart: `establishment_name`, `address`,
/// `rating`, and zero or more `images` file entries (entries without an
/// attached file are skipped).
pub async fn create<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  caller: Caller,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let mut establishment_name: Option<String> = None;
  let mut address: Option<String> = None;
  let mut rating: Option<i64> = None;
  let mut attachments: Vec<ImageUpload> = Vec::new();

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.to_string()))?
  {
    match field.name().unwrap_or_default() {
      "establishment_name" => {
        establishment_name = Some(text(field).await?);
      }
      "address" => {
        address = Some(text(field).await?);
      }
      "rating" => {
        let raw = text(field).await?;
        rating = Some(
          raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid rating: {raw:?}")))?,
        );
      }
      "images" => {
        // Entries without a filename carry no file; skip them.
        let Some(filename) = field.file_name().map(str::to_owned) else {
          continue;
        };
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
          .bytes()
          .await
          .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        attachments.push(ImageUpload {
          filename: Some(filename),
          content_type,
          bytes,
        });
      }
      _ => {}
    }
  }

  let establishment_name = establishment_name
    .ok_or_else(|| ApiError::BadRequest("missing field: establishment_name".into()))?;
  let address =
    address.ok_or_else(|| ApiError::BadRequest("missing field: address".into()))?;
  let rating =
    rating.ok_or_else(|| ApiError::BadRequest("missing field: rating".into()))?;

  let review = workflow::create_review(
    state.store.as_ref(),
    state.geocoder.as_ref(),
    state.images.as_ref(),
    &caller.identity,
    &caller.credential,
    establishment_name,
    address,
    rating,
    attachments,
  )
  .await?;

  Ok((StatusCode::CREATED, Json(review)))
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
  field
    .text()
    .await
    .map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// Form body accepted by `PUT /v1/reviews/:id`. Absent fields are left
/// untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
  pub establishment_name: Option<String>,
  pub address:            Option<String>,
  pub rating:             Option<i64>,
}

/// `PUT /v1/reviews/:id` — author only. A changed address is
/// re-geocoded; an unchanged one costs no geocoder call.
pub async fn update<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  Path(id): Path<Uuid>,
  caller: Caller,
  Form(form): Form<UpdateForm>,
) -> Result<Json<Review>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  let review = workflow::update_review(
    state.store.as_ref(),
    state.geocoder.as_ref(),
    id,
    caller.email(),
    ReviewPatch {
      establishment_name: form.establishment_name,
      address:            form.address,
      rating:             form.rating,
    },
  )
  .await?;
  Ok(Json(review))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /v1/reviews/:id` — author only.
pub async fn delete_one<S, V, G, I>(
  State(state): State<AppState<S, V, G, I>>,
  Path(id): Path<Uuid>,
  caller: Caller,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: MapStore + 'static,
  V: TokenVerifier + 'static,
  G: Geocoder + 'static,
  I: ImageHost + 'static,
{
  workflow::delete_review(state.store.as_ref(), id, caller.email()).await?;
  Ok(Json(json!({ "message": "review deleted" })))
}
