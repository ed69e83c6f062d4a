//! Error type for `squares-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column did not decode into its domain type.
  #[error("decode error: {0}")]
  Decode(String),

  #[error("invalid board location: {0}")]
  InvalidLocation(u8),

  /// An upsert's `RETURNING` clause produced no row.
  #[error("no row returned from {0}")]
  MissingRow(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
