//! The error taxonomy shared by every concept.
//!
//! Concepts surface these synchronously; the orchestration layer never
//! catches and retries — an error aborts the remaining steps of its request
//! and is reported to the caller verbatim. Every variant except [`Store`]
//! is an expected domain failure, not a server fault.
//!
//! [`Store`]: Error::Store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A referenced entity is absent.
  #[error("not found: {0}")]
  NotFound(String),

  /// Authorization, ownership, or state-precondition failure.
  #[error("not allowed: {0}")]
  NotAllowed(String),

  /// Malformed input (e.g. an unparsable picture URL).
  #[error("invalid input: {0}")]
  Validation(String),

  /// Bad credentials, or a logged-out caller on a logged-in-only operation.
  #[error("authentication failed: {0}")]
  Authentication(String),

  /// A uniqueness invariant would be violated (duplicate username, duplicate
  /// task name, existing ledger entry).
  #[error("conflict: {0}")]
  Conflict(String),

  /// Infrastructure failure in the document store.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error. Used at every concept/store boundary.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
