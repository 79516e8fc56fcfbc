//! In-memory entity cache with a freshness policy and optimistic writes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::error::{CacheError, CacheResult};
use super::merge;
use super::traits::{Entity, EntityKey, Patch, StockStatus, Stocked};
use crate::remote::RemoteStore;

/// How long a full list stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Kinds of remote reads that count towards `loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
  /// `fetch_all`
  List,
  /// `fetch_one`
  Single,
}

struct State<E> {
  items: Vec<E>,
  /// Monotonic time of the last successful full fetch
  fetched: Option<Instant>,
  /// Wall-clock time of the same fetch, for display
  fetched_at: Option<DateTime<Utc>>,
  error: Option<String>,
  lists_in_flight: usize,
  singles_in_flight: usize,
  /// Bumped on every change to `items`
  revision: u64,
}

impl<E> State<E> {
  fn counter(&mut self, kind: LoadKind) -> &mut usize {
    match kind {
      LoadKind::List => &mut self.lists_in_flight,
      LoadKind::Single => &mut self.singles_in_flight,
    }
  }

  fn in_flight(&self, kind: LoadKind) -> usize {
    match kind {
      LoadKind::List => self.lists_in_flight,
      LoadKind::Single => self.singles_in_flight,
    }
  }

  fn touch(&mut self) {
    self.revision = self.revision.wrapping_add(1);
  }
}

impl<E: Entity> State<E> {
  fn position(&self, id: &EntityKey) -> Option<usize> {
    self
      .items
      .iter()
      .position(|item| item.key().as_ref() == Some(id))
  }

  /// Insert or merge an entity the server handed back.
  fn upsert(&mut self, incoming: &E) -> CacheResult<()> {
    let Some(key) = incoming.key() else {
      return Ok(());
    };

    match self.position(&key) {
      Some(i) => {
        self.items[i] = merge::merge_restoring_id(&self.items[i], incoming)?;
      }
      None => self.items.push(incoming.clone()),
    }
    self.touch();
    Ok(())
  }
}

/// Keeps a load counter raised for as long as it lives.
struct LoadingGuard<'a, E> {
  state: &'a Mutex<State<E>>,
  kind: LoadKind,
}

impl<E> Drop for LoadingGuard<'_, E> {
  fn drop(&mut self) {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    let counter = state.counter(self.kind);
    *counter = counter.saturating_sub(1);
  }
}

/// Client-side mirror of a remote collection.
///
/// Reads are served from memory. Writes are applied locally before the
/// remote store confirms them and reverted if it refuses. The state lock
/// is only held between awaits, so every action looks atomic to readers.
pub struct EntityCache<E, S: ?Sized> {
  store: Arc<S>,
  state: Mutex<State<E>>,
  ttl: Duration,
}

impl<E, S> EntityCache<E, S>
where
  E: Entity,
  S: RemoteStore<E> + ?Sized,
{
  pub fn new(store: impl Into<Arc<S>>) -> Self {
    Self {
      store: store.into(),
      state: Mutex::new(State {
        items: Vec::new(),
        fetched: None,
        fetched_at: None,
        error: None,
        lists_in_flight: 0,
        singles_in_flight: 0,
        revision: 0,
      }),
      ttl: DEFAULT_TTL,
    }
  }

  /// Set how long a full list is served without asking the remote store.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  fn state(&self) -> MutexGuard<'_, State<E>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn begin_load(&self, kind: LoadKind) -> LoadingGuard<'_, E> {
    let mut state = self.state();
    state.error = None;
    *state.counter(kind) += 1;
    LoadingGuard {
      state: &self.state,
      kind,
    }
  }

  /// Record a failure for observers and hand it back to the caller.
  fn fail(&self, action: &'static str, err: impl Into<CacheError>) -> CacheError {
    let err = err.into();
    warn!(entity = E::entity_type(), action, error = %err, "cache action failed");
    self.state().error = Some(err.to_string());
    err
  }

  // ==========================================================================
  // Read path
  // ==========================================================================

  /// Load the whole collection.
  ///
  /// Skipped while the cached list is non-empty and younger than the TTL,
  /// unless `force` is set. On success the collection is replaced as
  /// returned; on failure it is left untouched.
  pub async fn fetch_all(&self, force: bool) -> CacheResult<()> {
    {
      let state = self.state();
      let fresh = state
        .fetched
        .is_some_and(|at| at.elapsed() < self.ttl);
      if !force && fresh && !state.items.is_empty() {
        debug!(entity = E::entity_type(), count = state.items.len(), "list cache hit");
        return Ok(());
      }
    }

    let _loading = self.begin_load(LoadKind::List);
    debug!(entity = E::entity_type(), force, "fetching list");

    match self.store.list().await {
      Ok(items) => {
        let mut state = self.state();
        info!(entity = E::entity_type(), count = items.len(), "list loaded");
        state.items = items;
        state.fetched = Some(Instant::now());
        state.fetched_at = Some(Utc::now());
        state.touch();
        Ok(())
      }
      Err(err) => Err(self.fail("fetch_all", err)),
    }
  }

  /// Load one entity, ignoring the TTL, and merge it into the collection.
  pub async fn fetch_one(&self, id: impl Into<EntityKey>) -> CacheResult<E> {
    let id = id.into();
    let _loading = self.begin_load(LoadKind::Single);
    debug!(entity = E::entity_type(), %id, "fetching entity");

    let entity = self
      .store
      .get(&id)
      .await
      .map_err(|err| self.fail("fetch_one", err))?;

    let merged = self.state().upsert(&entity);
    merged.map_err(|err| self.fail("fetch_one", err))?;
    Ok(entity)
  }

  /// Every entity, sorted by its label. Equal labels keep their order.
  pub fn all(&self) -> Vec<E> {
    let mut items = self.state().items.clone();
    items.sort_by_cached_key(|item| collation_key(&item.sort_label()));
    items
  }

  /// The live entity with the given id.
  pub fn by_id(&self, id: impl Into<EntityKey>) -> Option<E> {
    let id = id.into();
    let state = self.state();
    state.position(&id).map(|i| state.items[i].clone())
  }

  /// The collection in storage order.
  pub fn snapshot(&self) -> Vec<E> {
    self.state().items.clone()
  }

  pub fn len(&self) -> usize {
    self.state().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.state().items.is_empty()
  }

  /// True while any list or single fetch is outstanding.
  pub fn is_loading(&self) -> bool {
    let state = self.state();
    state.lists_in_flight > 0 || state.singles_in_flight > 0
  }

  pub fn is_loading_kind(&self, kind: LoadKind) -> bool {
    self.state().in_flight(kind) > 0
  }

  /// Message of the most recent failure.
  pub fn last_error(&self) -> Option<String> {
    self.state().error.clone()
  }

  /// When the collection was last loaded in full.
  pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
    self.state().fetched_at
  }

  /// Changes whenever the collection does; views can compare it to skip
  /// recomputation.
  pub fn revision(&self) -> u64 {
    self.state().revision
  }

  /// Mark the cached list stale so the next `fetch_all` hits the store.
  pub fn invalidate(&self) {
    let mut state = self.state();
    state.fetched = None;
    debug!(entity = E::entity_type(), "list invalidated");
  }

  // ==========================================================================
  // Write path
  // ==========================================================================

  /// Create an entity. It only appears locally once the server assigned
  /// its id.
  pub async fn create_one(&self, partial: impl Serialize) -> CacheResult<E> {
    let partial = Patch::from_serialize(&partial).map_err(|err| self.fail("create_one", err))?;

    let created = self
      .store
      .create(&partial)
      .await
      .map_err(|err| self.fail("create_one", err))?;

    let merged = self.state().upsert(&created);
    merged.map_err(|err| self.fail("create_one", err))?;
    info!(entity = E::entity_type(), id = ?created.key(), "entity created");
    Ok(created)
  }

  /// Patch an entity optimistically.
  ///
  /// `patch` is anything that serializes to a sparse object, e.g. a
  /// [`Patch`] or a typed partial struct. The patch (minus any id field) is
  /// overlaid on the local copy before the remote call; the server's answer
  /// then replaces the guess. If the server refuses, the copy taken before
  /// the overlay is put back.
  pub async fn update_one(
    &self,
    id: impl Into<EntityKey>,
    patch: impl Serialize,
  ) -> CacheResult<E> {
    let id = id.into();
    let patch = Patch::from_serialize(&patch)
      .map_err(|err| self.fail("update_one", err))?
      .without_id::<E>();

    let previous = self
      .apply_optimistic(&id, &patch)
      .map_err(|err| self.fail("update_one", err))?;

    match self.store.update(&id, &patch).await {
      Ok(saved) => {
        let merged = self.state().upsert(&saved);
        merged.map_err(|err| self.fail("update_one", err))?;
        debug!(entity = E::entity_type(), %id, "update confirmed");
        Ok(saved)
      }
      Err(err) => {
        if let Some(previous) = previous {
          self.restore(&id, previous);
        }
        Err(self.fail("update_one", err))
      }
    }
  }

  /// Overlay `patch` on the local entity, returning its prior value.
  /// Returns None when the entity is not cached.
  fn apply_optimistic(&self, id: &EntityKey, patch: &Patch) -> CacheResult<Option<E>> {
    let mut state = self.state();
    let Some(i) = state.position(id) else {
      debug!(entity = E::entity_type(), %id, "not cached, updating remotely only");
      return Ok(None);
    };

    let previous = state.items[i].clone();
    state.items[i] = merge::overlay_defined(&previous, patch)?;
    state.touch();
    debug!(entity = E::entity_type(), %id, "optimistic update applied");
    Ok(Some(previous))
  }

  fn restore(&self, id: &EntityKey, previous: E) {
    let mut state = self.state();
    match state.position(id) {
      Some(i) => {
        state.items[i] = previous;
        state.touch();
        info!(entity = E::entity_type(), %id, "update rolled back");
      }
      None => {
        warn!(entity = E::entity_type(), %id, "entity gone before rollback, nothing restored");
      }
    }
  }

  /// Remove an entity optimistically; the previous collection comes back
  /// if the server refuses.
  pub async fn remove_one(&self, id: impl Into<EntityKey>) -> CacheResult<()> {
    let id = id.into();

    let previous = {
      let mut state = self.state();
      let previous = state.items.clone();
      state.items.retain(|item| item.key().as_ref() != Some(&id));
      state.touch();
      previous
    };

    match self.store.delete(&id).await {
      Ok(()) => {
        info!(entity = E::entity_type(), %id, "entity removed");
        Ok(())
      }
      Err(err) => {
        {
          let mut state = self.state();
          state.items = previous;
          state.touch();
        }
        info!(entity = E::entity_type(), %id, "removal rolled back");
        Err(self.fail("remove_one", err))
      }
    }
  }
}

impl<E, S> EntityCache<E, S>
where
  E: Entity + Stocked,
  S: RemoteStore<E> + ?Sized,
{
  pub fn status_of(&self, item: &E) -> StockStatus {
    StockStatus::classify(item)
  }

  /// Entities running low, fewest units first.
  pub fn low_stock_items(&self) -> Vec<E> {
    let mut items: Vec<E> = self
      .state()
      .items
      .iter()
      .filter(|item| StockStatus::classify(*item) == StockStatus::Low)
      .cloned()
      .collect();
    items.sort_by(|a, b| a.quantity().total_cmp(&b.quantity()));
    items
  }

  /// Entities with nothing left, in storage order.
  pub fn empty_items(&self) -> Vec<E> {
    self
      .state()
      .items
      .iter()
      .filter(|item| StockStatus::classify(*item) == StockStatus::Empty)
      .cloned()
      .collect()
  }
}

/// Sort key approximating locale-aware comparison: accents and case are
/// ignored first, then break ties.
fn collation_key(label: &str) -> (String, String, String) {
  let base: String = label
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .flat_map(char::to_lowercase)
    .collect();
  let accented = label.to_lowercase();
  // lowercase sorts before uppercase
  let cased: String = label
    .chars()
    .map(|c| {
      if c.is_lowercase() {
        c.to_uppercase().next().unwrap_or(c)
      } else {
        c.to_lowercase().next().unwrap_or(c)
      }
    })
    .collect();
  (base, accented, cased)
}
