//! In-memory remote store for tests.

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{RemoteStore, StoreError, StoreResult};
use crate::cache::{merge, Entity, EntityKey, Patch};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
  pub list: usize,
  pub get: usize,
  pub create: usize,
  pub update: usize,
  pub delete: usize,
}

impl CallCounts {
  pub fn total(&self) -> usize {
    self.list + self.get + self.create + self.update + self.delete
  }
}

type Rewrite<E> = Box<dyn Fn(E) -> E + Send + Sync>;

struct Inner<E> {
  rows: BTreeMap<EntityKey, E>,
  calls: CallCounts,
  fail_with: Option<StoreError>,
  rewrite: Option<Rewrite<E>>,
}

/// Server double: keeps rows, counts calls, can fail every call or hold
/// calls until released.
pub struct FakeStore<E> {
  inner: Mutex<Inner<E>>,
  next_id: AtomicUsize,
  gated: Mutex<bool>,
  gate: Arc<Notify>,
  entered: Arc<Notify>,
}

impl<E: Entity> FakeStore<E> {
  pub fn new(rows: Vec<E>) -> Self {
    let rows: BTreeMap<_, _> = rows
      .into_iter()
      .filter_map(|row| row.key().map(|k| (k, row)))
      .collect();
    Self {
      inner: Mutex::new(Inner {
        rows,
        calls: CallCounts::default(),
        fail_with: None,
        rewrite: None,
      }),
      next_id: AtomicUsize::new(100),
      gated: Mutex::new(false),
      gate: Arc::new(Notify::new()),
      entered: Arc::new(Notify::new()),
    }
  }

  pub fn calls(&self) -> CallCounts {
    self.inner.lock().unwrap().calls
  }

  /// Make every following call fail with `err` (None to heal).
  pub fn fail_with(&self, err: Option<StoreError>) {
    self.inner.lock().unwrap().fail_with = err;
  }

  /// Post-process every saved row, like a server normalizing input.
  pub fn rewrite_with(&self, rewrite: impl Fn(E) -> E + Send + Sync + 'static) {
    self.inner.lock().unwrap().rewrite = Some(Box::new(rewrite));
  }

  pub fn set_rows(&self, rows: Vec<E>) {
    let mut inner = self.inner.lock().unwrap();
    inner.rows = rows
      .into_iter()
      .filter_map(|row| row.key().map(|k| (k, row)))
      .collect();
  }

  pub fn row(&self, id: impl Into<EntityKey>) -> Option<E> {
    self.inner.lock().unwrap().rows.get(&id.into()).cloned()
  }

  /// Hold the next call until [`release`](Self::release) is called.
  pub fn hold(&self) {
    *self.gated.lock().unwrap() = true;
  }

  /// Let the held call continue.
  pub fn release(&self) {
    self.gate.notify_one();
  }

  /// Resolves once the held call has reached the store.
  pub async fn entered(&self) {
    self.entered.notified().await;
  }

  async fn enter(&self, count: impl FnOnce(&mut CallCounts)) -> StoreResult<()> {
    count(&mut self.inner.lock().unwrap().calls);

    let gated = std::mem::take(&mut *self.gated.lock().unwrap());
    if gated {
      self.entered.notify_one();
      self.gate.notified().await;
    }

    match self.inner.lock().unwrap().fail_with.clone() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn not_found(id: &EntityKey) -> StoreError {
    StoreError::NotFound {
      entity: E::entity_type(),
      id: id.clone(),
    }
  }
}

impl<E: Entity> FakeStore<E> {
  async fn list_rows(&self) -> StoreResult<Vec<E>> {
    self.enter(|c| c.list += 1).await?;
    let inner = self.inner.lock().unwrap();
    Ok(inner.rows.values().cloned().collect())
  }

  async fn get_row(&self, id: &EntityKey) -> StoreResult<E> {
    self.enter(|c| c.get += 1).await?;
    let inner = self.inner.lock().unwrap();
    inner.rows.get(id).cloned().ok_or_else(|| Self::not_found(id))
  }

  async fn insert_row(&self, partial: &Patch) -> StoreResult<E> {
    self.enter(|c| c.create += 1).await?;
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    let mut value = partial.clone().into_value();
    if let Value::Object(map) = &mut value {
      map.insert(E::ID_FIELD.to_string(), Value::from(id));
    }
    let created: E = serde_json::from_value(value).map_err(|e| StoreError::Validation {
      message: e.to_string(),
    })?;
    let mut inner = self.inner.lock().unwrap();
    inner
      .rows
      .insert(EntityKey::from(id as u64), created.clone());
    Ok(created)
  }

  async fn patch_row(&self, id: &EntityKey, patch: &Patch) -> StoreResult<E> {
    self.enter(|c| c.update += 1).await?;
    let mut inner = self.inner.lock().unwrap();
    let row = inner.rows.get(id).ok_or_else(|| Self::not_found(id))?;
    let mut saved = merge::overlay_defined(row, patch).map_err(|e| StoreError::Validation {
      message: e.to_string(),
    })?;
    if let Some(rewrite) = &inner.rewrite {
      saved = rewrite(saved);
    }
    inner.rows.insert(id.clone(), saved.clone());
    Ok(saved)
  }

  async fn delete_row(&self, id: &EntityKey) -> StoreResult<()> {
    self.enter(|c| c.delete += 1).await?;
    let mut inner = self.inner.lock().unwrap();
    inner
      .rows
      .remove(id)
      .map(|_| ())
      .ok_or_else(|| Self::not_found(id))
  }
}

impl<E: Entity> RemoteStore<E> for FakeStore<E> {
  fn list(&self) -> BoxFuture<'_, StoreResult<Vec<E>>> {
    Box::pin(self.list_rows())
  }

  fn get<'a>(&'a self, id: &'a EntityKey) -> BoxFuture<'a, StoreResult<E>> {
    Box::pin(self.get_row(id))
  }

  fn create<'a>(&'a self, partial: &'a Patch) -> BoxFuture<'a, StoreResult<E>> {
    Box::pin(self.insert_row(partial))
  }

  fn update<'a>(&'a self, id: &'a EntityKey, patch: &'a Patch) -> BoxFuture<'a, StoreResult<E>> {
    Box::pin(self.patch_row(id, patch))
  }

  fn delete<'a>(&'a self, id: &'a EntityKey) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(self.delete_row(id))
  }
}
