//! Remote store seam.
//!
//! The cache talks to the server only through [`RemoteStore`]. Transport
//! details (HTTP, auth, timeouts) belong to the implementations.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::cache::{Entity, EntityKey, Patch};

pub use http::HttpStore;

/// Failure reported by a remote store call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
  /// Network or HTTP failure
  #[error("{message}")]
  Transport {
    status: Option<u16>,
    message: String,
  },
  /// The server does not know the entity
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: EntityKey },
  /// The server rejected the payload
  #[error("invalid payload: {message}")]
  Validation { message: String },
}

impl StoreError {
  pub fn transport(message: impl Into<String>) -> Self {
    StoreError::Transport {
      status: None,
      message: message.into(),
    }
  }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD contract of the server-side collection.
///
/// Every call may fail; callers never retry.
pub trait RemoteStore<E: Entity>: Send + Sync {
  /// Fetch the whole collection.
  fn list(&self) -> BoxFuture<'_, StoreResult<Vec<E>>>;

  /// Fetch a single entity.
  fn get<'a>(&'a self, id: &'a EntityKey) -> BoxFuture<'a, StoreResult<E>>;

  /// Create an entity; the server assigns the id.
  fn create<'a>(&'a self, partial: &'a Patch) -> BoxFuture<'a, StoreResult<E>>;

  /// Apply a patch and return the server's post-merge entity.
  fn update<'a>(&'a self, id: &'a EntityKey, patch: &'a Patch) -> BoxFuture<'a, StoreResult<E>>;

  /// Delete an entity.
  fn delete<'a>(&'a self, id: &'a EntityKey) -> BoxFuture<'a, StoreResult<()>>;
}
