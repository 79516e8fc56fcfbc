//! Generic entity cache with optimistic writes.
//!
//! This module mirrors a remote collection in memory:
//! - Serves full lists from memory while they are younger than a TTL
//! - Merges single fetches and server answers into the collection by id
//! - Applies updates and removals before the server confirms them, and
//!   rolls them back when it refuses
//! - Derives sorted and stock-status views from the collection

mod error;
pub(crate) mod merge;
mod store;
mod traits;

pub use error::{CacheError, CacheResult};
pub use store::{EntityCache, LoadKind, DEFAULT_TTL};
pub use traits::{Entity, EntityKey, Patch, StockStatus, Stocked};
