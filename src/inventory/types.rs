use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::cache::EntityKey;

/// Article id as the server hands it out (numeric or textual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleId {
  Number(u64),
  Text(String),
}

impl fmt::Display for ArticleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArticleId::Number(n) => write!(f, "{}", n),
      ArticleId::Text(s) => f.write_str(s),
    }
  }
}

impl From<&ArticleId> for EntityKey {
  fn from(id: &ArticleId) -> Self {
    match id {
      ArticleId::Number(n) => EntityKey::from(*n),
      ArticleId::Text(s) => EntityKey::from(s),
    }
  }
}

/// Stock article
///
/// Optional fields serialize as `null` when unset, so a value the server
/// cleared also clears the cached copy on merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
  pub id: ArticleId,
  #[serde(default)]
  pub sku: String,
  #[serde(default)]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_zero")]
  pub stock: f64,
  #[serde(default)]
  pub min_stock: Option<f64>,
  #[serde(default)]
  pub unit: Option<String>,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
  Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partial article for create and update calls.
///
/// Has no id field: an article's id is fixed by the server. Unset fields
/// are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sku: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stock: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub min_stock: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::Patch;
  use serde_json::{json, Value};

  #[test]
  fn test_article_wire_format() {
    let article: Article = serde_json::from_value(json!({
      "id": 1,
      "sku": "HM-01",
      "name": "Hammer",
      "stock": 10,
      "minStock": 2
    }))
    .unwrap();

    assert_eq!(article.id, ArticleId::Number(1));
    assert_eq!(article.min_stock, Some(2.0));
    assert_eq!(article.unit, None);

    let text: Article = serde_json::from_value(json!({"id": "a-7", "name": "Dübel"})).unwrap();
    assert_eq!(text.id, ArticleId::Text("a-7".to_string()));
    assert_eq!(text.stock, 0.0);
  }

  #[test]
  fn test_null_stock_reads_as_zero() {
    let article: Article =
      serde_json::from_value(json!({"id": 3, "name": "Zange", "stock": null})).unwrap();
    assert_eq!(article.stock, 0.0);
  }

  #[test]
  fn test_unset_fields_serialize_as_null() {
    let article: Article = serde_json::from_value(json!({"id": 1, "notes": "Regal links"})).unwrap();
    let value = serde_json::to_value(Article {
      notes: None,
      ..article
    })
    .unwrap();

    assert_eq!(value["notes"], Value::Null);
    assert_eq!(value["minStock"], Value::Null);
  }

  #[test]
  fn test_patch_carries_only_set_fields() {
    let patch = Patch::from_serialize(&ArticlePatch {
      stock: Some(5.0),
      min_stock: Some(1.0),
      ..Default::default()
    })
    .unwrap();

    assert_eq!(patch.fields().len(), 2);
    assert_eq!(patch.fields().get("minStock"), Some(&json!(1.0)));
    assert!(!patch.contains("name"));
  }
}
