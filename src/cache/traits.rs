//! Core traits and types for the entity cache.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Trait for entities that can live in an [`EntityCache`](super::EntityCache).
///
/// Implementors are plain serde records; the cache merges and overlays them
/// field-wise through their JSON object form.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Name of the identifier field assigned by the remote store.
  const ID_FIELD: &'static str = "id";

  /// Entity type name for logs and error messages (e.g., "article")
  fn entity_type() -> &'static str;

  /// Identifier of this entity, or None if the server has not assigned one yet.
  fn key(&self) -> Option<EntityKey>;

  /// Display label the `all` view sorts by.
  fn sort_label(&self) -> String;
}

/// String-normalized entity identifier.
///
/// Remote ids may arrive as numbers or strings; `7` and `"7"` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(String);

impl EntityKey {
  /// Normalize a JSON id value. Only numbers and strings are identifiers.
  pub fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Number(n) => Some(Self(n.to_string())),
      Value::String(s) => Some(Self(s.clone())),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for EntityKey {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for EntityKey {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl From<&String> for EntityKey {
  fn from(s: &String) -> Self {
    Self(s.clone())
  }
}

impl From<u64> for EntityKey {
  fn from(n: u64) -> Self {
    Self(n.to_string())
  }
}

impl From<i64> for EntityKey {
  fn from(n: i64) -> Self {
    Self(n.to_string())
  }
}

impl From<u32> for EntityKey {
  fn from(n: u32) -> Self {
    Self(n.to_string())
  }
}

impl From<i32> for EntityKey {
  fn from(n: i32) -> Self {
    Self(n.to_string())
  }
}

/// A sparse partial entity.
///
/// Keys present in the patch overwrite the entity's fields; absent keys leave
/// them untouched. An explicit `null` is a value and does overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a patch from a typed partial struct.
  ///
  /// Fields skipped during serialization (e.g. `None` with
  /// `skip_serializing_if`) stay absent from the patch.
  pub fn from_serialize<T: Serialize>(value: &T) -> serde_json::Result<Self> {
    match serde_json::to_value(value)? {
      Value::Object(map) => Ok(Self(map)),
      Value::Null => Ok(Self::default()),
      other => Err(serde::de::Error::custom(format!(
        "patch must serialize to an object, got {}",
        other
      ))),
    }
  }

  /// Set a single field.
  pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.0.insert(field.into(), value.into());
    self
  }

  /// Drop the identifier field; a patch never moves an entity to another id.
  pub fn without_id<E: Entity>(mut self) -> Self {
    self.0.remove(E::ID_FIELD);
    self
  }

  pub fn contains(&self, field: &str) -> bool {
    self.0.contains_key(field)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn fields(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn into_value(self) -> Value {
    Value::Object(self.0)
  }
}

/// Stock semantics for entities the status views classify.
pub trait Stocked {
  /// Units on hand. Missing quantities count as zero.
  fn quantity(&self) -> f64;

  /// Reorder threshold, if one is configured.
  fn min_threshold(&self) -> Option<f64>;
}

/// Stock classification of a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
  /// Quantity above the threshold, or no threshold set
  Ok,
  /// Still in stock but at or below a positive threshold
  Low,
  /// Nothing left
  Empty,
}

impl StockStatus {
  /// Classify an entity. A zero or unset threshold never yields `Low`.
  pub fn classify<T: Stocked + ?Sized>(item: &T) -> Self {
    let quantity = item.quantity();
    let min = item.min_threshold().unwrap_or(0.0);

    if quantity <= 0.0 {
      StockStatus::Empty
    } else if min > 0.0 && quantity <= min {
      StockStatus::Low
    } else {
      StockStatus::Ok
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      StockStatus::Ok => "ok",
      StockStatus::Low => "low",
      StockStatus::Empty => "empty",
    }
  }
}

impl fmt::Display for StockStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
