//! Error type for `rowkeep-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rowkeep_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("item not found: {0:?}")]
  ItemNotFound(String),

  #[error("ordering {number} of {item:?} overflows its quantity {quantity}")]
  QuantityOverflow {
    item:     String,
    quantity: i64,
    number:   i64,
  },

  /// A table already exists but lacks columns this version declares. The
  /// provisioner never migrates; the database must be fixed by hand.
  #[error("table {table} exists but is missing columns: {}", missing.join(", "))]
  SchemaMismatch {
    table:   &'static str,
    missing: Vec<String>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
