//! Session-handle extractor.
//!
//! The opaque handle travels in the `x-session-id` header. A handle seen for
//! the first time is registered LoggedOut; a request without one gets a
//! fresh handle minted, which the login response hands back to the client.

use axum::{extract::FromRequestParts, http::request::Parts};
use repset_core::{Error, store::DocStore};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub const SESSION_HEADER: &str = "x-session-id";

/// The caller's session handle; state lives in the Sessioning concept.
#[derive(Debug, Clone, Copy)]
pub struct Session(pub Uuid);

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: DocStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    match parts.headers.get(SESSION_HEADER) {
      Some(raw) => {
        let id = raw
          .to_str()
          .ok()
          .and_then(|s| Uuid::parse_str(s).ok())
          .ok_or_else(|| {
            ApiError(Error::Validation("malformed session id".into()))
          })?;
        state.app.sessioning.ensure(id);
        Ok(Self(id))
      }
      None => Ok(Self(state.app.sessioning.create())),
    }
  }
}
