//! Field-level merge helpers.
//!
//! Entities are merged through their JSON object form so the cache stays
//! agnostic of the concrete field set.

use serde_json::{Map, Value};

use super::error::CacheError;
use super::traits::{Entity, Patch};

fn to_object<E: Entity>(entity: &E) -> Result<Map<String, Value>, CacheError> {
  match serde_json::to_value(entity)? {
    Value::Object(map) => Ok(map),
    _ => Err(CacheError::NotAnObject {
      entity: E::entity_type(),
    }),
  }
}

fn finish<E: Entity>(mut merged: Map<String, Value>, id: Option<Value>) -> Result<E, CacheError> {
  match id {
    Some(id) => {
      merged.insert(E::ID_FIELD.to_string(), id);
    }
    None => {
      merged.remove(E::ID_FIELD);
    }
  }
  Ok(serde_json::from_value(Value::Object(merged))?)
}

/// Shallow merge: existing fields, then every incoming field, then the
/// existing id restored.
pub fn merge_restoring_id<E: Entity>(existing: &E, incoming: &E) -> Result<E, CacheError> {
  let mut merged = to_object(existing)?;
  let id = merged.get(E::ID_FIELD).cloned();

  merged.extend(to_object(incoming)?);
  finish(merged, id)
}

/// Sparse overlay: only the keys present in `patch` replace fields.
pub fn overlay_defined<E: Entity>(existing: &E, patch: &Patch) -> Result<E, CacheError> {
  let mut merged = to_object(existing)?;
  let id = merged.get(E::ID_FIELD).cloned();

  for (field, value) in patch.fields() {
    merged.insert(field.clone(), value.clone());
  }
  finish(merged, id)
}
