//! Cache wiring for articles.

use crate::cache::{CacheResult, Entity, EntityCache, EntityKey, Stocked};
use crate::remote::RemoteStore;

use super::types::{Article, ArticlePatch};

impl Entity for Article {
  fn entity_type() -> &'static str {
    "article"
  }

  fn key(&self) -> Option<EntityKey> {
    Some(EntityKey::from(&self.id))
  }

  fn sort_label(&self) -> String {
    self.name.clone()
  }
}

impl Stocked for Article {
  fn quantity(&self) -> f64 {
    self.stock
  }

  fn min_threshold(&self) -> Option<f64> {
    self.min_stock
  }
}

/// Article cache over any remote store.
pub type InventoryCache<S> = EntityCache<Article, S>;

impl<S> EntityCache<Article, S>
where
  S: RemoteStore<Article> + ?Sized,
{
  /// Change the reorder threshold of an article.
  pub async fn set_min_stock(&self, id: impl Into<EntityKey>, value: f64) -> CacheResult<Article> {
    let patch = ArticlePatch {
      min_stock: Some(value),
      ..Default::default()
    };
    self.update_one(id, patch).await
  }
}
