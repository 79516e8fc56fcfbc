//! JSON-over-HTTP remote store.

use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{RemoteStore, StoreError, StoreResult};
use crate::cache::{Entity, EntityKey, Patch};

/// Remote store backed by a REST resource.
///
/// `{base}/{resource}` lists and creates, `{base}/{resource}/{id}` reads,
/// updates (PUT) and deletes.
pub struct HttpStore<E> {
  client: reqwest::Client,
  base: Url,
  resource: String,
  token: Option<String>,
  _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for HttpStore<E> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      base: self.base.clone(),
      resource: self.resource.clone(),
      token: self.token.clone(),
      _entity: PhantomData,
    }
  }
}

impl<E: Entity> HttpStore<E> {
  pub fn new(base: Url, resource: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
    if base.cannot_be_a_base() {
      return Err(StoreError::transport(format!(
        "{} cannot be used as a base url",
        base
      )));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| StoreError::transport(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base,
      resource: resource.into(),
      token: None,
      _entity: PhantomData,
    })
  }

  /// Send a bearer token with every request.
  pub fn with_token(mut self, token: Option<String>) -> Self {
    self.token = token;
    self
  }

  /// Endpoint for the collection, or for one entity when `id` is given.
  pub fn endpoint(&self, id: Option<&EntityKey>) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(&self.resource);
      if let Some(id) = id {
        segments.push(id.as_str());
      }
    }
    url
  }

  fn request(&self, method: Method, id: Option<&EntityKey>) -> RequestBuilder {
    let url = self.endpoint(id);
    debug!(%method, %url, "remote request");

    let request = self.client.request(method, url);
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn send(&self, request: RequestBuilder, id: Option<&EntityKey>) -> StoreResult<Response> {
    let response = request
      .send()
      .await
      .map_err(|e| StoreError::transport(format!("Request failed: {}", e)))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(E::entity_type(), id, status, &body))
  }

  async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
    response
      .json::<T>()
      .await
      .map_err(|e| StoreError::transport(format!("Invalid response body: {}", e)))
  }
}

/// Map a non-success HTTP status onto the store error taxonomy.
pub(crate) fn status_error(
  entity: &'static str,
  id: Option<&EntityKey>,
  status: StatusCode,
  body: &str,
) -> StoreError {
  let body = body.trim();
  let message = if body.is_empty() {
    format!("HTTP {}", status.as_u16())
  } else {
    format!("HTTP {}: {}", status.as_u16(), body)
  };

  match (status, id) {
    (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound {
      entity,
      id: id.clone(),
    },
    (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
      StoreError::Validation { message }
    }
    _ => StoreError::Transport {
      status: Some(status.as_u16()),
      message,
    },
  }
}

impl<E: Entity> HttpStore<E> {
  async fn fetch_list(&self) -> StoreResult<Vec<E>> {
    let response = self.send(self.request(Method::GET, None), None).await?;
    Self::decode(response).await
  }

  async fn fetch_entity(&self, id: &EntityKey) -> StoreResult<E> {
    let response = self
      .send(self.request(Method::GET, Some(id)), Some(id))
      .await?;
    Self::decode(response).await
  }

  async fn post(&self, partial: &Patch) -> StoreResult<E> {
    let request = self.request(Method::POST, None).json(partial.fields());
    let response = self.send(request, None).await?;
    Self::decode(response).await
  }

  async fn put(&self, id: &EntityKey, patch: &Patch) -> StoreResult<E> {
    let request = self.request(Method::PUT, Some(id)).json(patch.fields());
    let response = self.send(request, Some(id)).await?;
    Self::decode(response).await
  }

  async fn remove(&self, id: &EntityKey) -> StoreResult<()> {
    // 204 No Content and any other success body are both fine
    self
      .send(self.request(Method::DELETE, Some(id)), Some(id))
      .await?;
    Ok(())
  }
}

impl<E: Entity> RemoteStore<E> for HttpStore<E> {
  fn list(&self) -> BoxFuture<'_, StoreResult<Vec<E>>> {
    Box::pin(self.fetch_list())
  }

  fn get<'a>(&'a self, id: &'a EntityKey) -> BoxFuture<'a, StoreResult<E>> {
    Box::pin(self.fetch_entity(id))
  }

  fn create<'a>(&'a self, partial: &'a Patch) -> BoxFuture<'a, StoreResult<E>> {
    Box::pin(self.post(partial))
  }

  fn update<'a>(&'a self, id: &'a EntityKey, patch: &'a Patch) -> BoxFuture<'a, StoreResult<E>> {
    Box::pin(self.put(id, patch))
  }

  fn delete<'a>(&'a self, id: &'a EntityKey) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(self.remove(id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::inventory::Article;

  fn http_store(base: &str) -> HttpStore<Article> {
    HttpStore::new(Url::parse(base).unwrap(), "inventory", Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn test_endpoint_paths() {
    let store = http_store("http://localhost:8000/api/");
    assert_eq!(
      store.endpoint(None).as_str(),
      "http://localhost:8000/api/inventory"
    );
    assert_eq!(
      store.endpoint(Some(&EntityKey::from(12u64))).as_str(),
      "http://localhost:8000/api/inventory/12"
    );

    let store = http_store("http://localhost:8000");
    assert_eq!(
      store.endpoint(Some(&EntityKey::from("a b"))).as_str(),
      "http://localhost:8000/inventory/a%20b"
    );
  }

  #[test]
  fn test_rejects_non_base_url() {
    let result = HttpStore::<Article>::new(
      Url::parse("mailto:someone@example.com").unwrap(),
      "inventory",
      Duration::from_secs(5),
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_status_mapping() {
    let id = EntityKey::from(3u64);

    assert_eq!(
      status_error("article", Some(&id), StatusCode::NOT_FOUND, ""),
      StoreError::NotFound {
        entity: "article",
        id: id.clone()
      }
    );
    assert_eq!(
      status_error("article", None, StatusCode::UNPROCESSABLE_ENTITY, "sku missing"),
      StoreError::Validation {
        message: "HTTP 422: sku missing".to_string()
      }
    );
    assert_eq!(
      status_error("article", None, StatusCode::NOT_FOUND, ""),
      StoreError::Transport {
        status: Some(404),
        message: "HTTP 404".to_string()
      }
    );
    assert_eq!(
      status_error("article", Some(&id), StatusCode::BAD_GATEWAY, " upstream down \n"),
      StoreError::Transport {
        status: Some(502),
        message: "HTTP 502: upstream down".to_string()
      }
    );
  }
}
