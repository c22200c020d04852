//! Error type for `repset-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Collection names must be lowercase identifiers (`[a-z_]+`).
  #[error("invalid collection name: {0:?}")]
  InvalidCollectionName(String),

  /// Field names used in filters, patches, and array operations must be
  /// identifiers (`[a-z0-9_]+`).
  #[error("invalid field name: {0:?}")]
  InvalidFieldName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
