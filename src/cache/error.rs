use thiserror::Error;

use crate::remote::StoreError;

/// Errors raised by cache actions.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The remote store rejected or failed the call.
  #[error(transparent)]
  Store(#[from] StoreError),

  /// An entity or patch could not be converted through its JSON form.
  #[error("failed to merge entity fields: {0}")]
  Codec(#[from] serde_json::Error),

  #[error("{entity} does not serialize to a JSON object")]
  NotAnObject { entity: &'static str },
}

impl CacheError {
  /// The remote store error behind this failure, if any.
  pub fn store_error(&self) -> Option<&StoreError> {
    match self {
      CacheError::Store(e) => Some(e),
      _ => None,
    }
  }
}

pub type CacheResult<T> = Result<T, CacheError>;
