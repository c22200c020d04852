//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every concept error kind maps to its status class; only store faults
//! surface as 500s.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler — a concept error crossing the HTTP
/// boundary.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub repset_core::Error);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use repset_core::Error;
    let (status, message) = match &self.0 {
      Error::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      Error::NotAllowed(m) => (StatusCode::FORBIDDEN, m.clone()),
      Error::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
      Error::Authentication(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      Error::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      Error::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
