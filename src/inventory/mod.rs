//! Inventory articles of the Handwerks portal.

mod cache;
mod types;

pub use cache::InventoryCache;
pub use types::{Article, ArticleId, ArticlePatch};
