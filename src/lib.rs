//! Client-side mirror of the Handwerks portal inventory.
//!
//! [`cache::EntityCache`] keeps a remote collection in memory, serves reads
//! with a TTL freshness policy and applies writes optimistically with
//! rollback. [`remote::RemoteStore`] is the seam to the server;
//! [`remote::HttpStore`] talks JSON over HTTP.

pub mod cache;
pub mod config;
pub mod inventory;
pub mod remote;
