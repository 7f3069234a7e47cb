//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use waypost_core::Error as CoreError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  /// Wrap a backend-specific store error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Core(CoreError::store(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Core(e) => (status_for(e), e.to_string()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
      );
    }
    res
  }
}

fn status_for(e: &CoreError) -> StatusCode {
  match e {
    CoreError::InvalidCredential => StatusCode::UNAUTHORIZED,
    CoreError::Forbidden => StatusCode::FORBIDDEN,
    CoreError::ReviewNotFound(_) | CoreError::LocationNotFound(_) => {
      StatusCode::NOT_FOUND
    }
    CoreError::InvalidRating(_) => StatusCode::BAD_REQUEST,
    CoreError::GeocodingUnavailable(_) | CoreError::UploadFailed(_) => {
      StatusCode::SERVICE_UNAVAILABLE
    }
    CoreError::Misconfigured(_) | CoreError::Store(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}
