//! Error types for `rowkeep-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown country code: {0:?}")]
  UnknownCountry(String),

  #[error("letter initial expected, got {0:?}")]
  InvalidInitial(char),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
