//! HTTP transport shared by all Resource Gateways.
//!
//! Decorates every request with the current bearer credential (a
//! snapshot read from the session token handle) and maps failures onto
//! the crate error taxonomy: non-2xx responses become
//! [`Error::Remote`], transport failures become [`Error::Network`].

use crate::api::payloads::ApiErrorBody;
use crate::error::{Error, Result};
use crate::session::SessionToken;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// The HTTP verbs the Resource Gateways issue. Gateways are generic
/// over this so their caching and invalidation behavior is testable
/// against a canned transport; [`Http`] is the reqwest-backed
/// implementation used in production.
///
/// The explicit `impl Future + Send` returns (instead of `async fn`)
/// let gateway read futures flow into the request cache, which shares
/// them across tasks.
pub trait Transport: Clone + Send + Sync + 'static {
  fn get<T: DeserializeOwned + Send>(
    &self,
    url: &str,
  ) -> impl Future<Output = Result<T>> + Send;

  fn post<T: DeserializeOwned + Send, B: Serialize + Sync>(
    &self,
    url: &str,
    body: &B,
  ) -> impl Future<Output = Result<T>> + Send;

  fn patch<T: DeserializeOwned + Send, B: Serialize + Sync>(
    &self,
    url: &str,
    body: &B,
  ) -> impl Future<Output = Result<T>> + Send;

  fn delete(&self, url: &str) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Clone)]
pub struct Http {
  client: reqwest::Client,
  token: SessionToken,
}

impl Http {
  pub fn new(token: SessionToken) -> Self {
    Self {
      client: reqwest::Client::new(),
      token,
    }
  }

  async fn request_json<T: DeserializeOwned, B: Serialize>(
    &self,
    method: Method,
    url: &str,
    body: Option<&B>,
  ) -> Result<T> {
    let response = self.execute(method, url, body).await?;
    Ok(response.json::<T>().await?)
  }

  async fn execute<B: Serialize>(
    &self,
    method: Method,
    url: &str,
    body: Option<&B>,
  ) -> Result<reqwest::Response> {
    let mut request = self.client.request(method.clone(), url);

    if let Some(token) = self.token.snapshot() {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    tracing::debug!(%method, url, "request");
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
      let err = remote_error(status, body.message);
      tracing::warn!(%method, url, %status, "request failed");
      return Err(err);
    }

    Ok(response)
  }
}

impl Transport for Http {
  async fn get<T: DeserializeOwned + Send>(&self, url: &str) -> Result<T> {
    self.request_json(Method::GET, url, None::<&()>).await
  }

  async fn post<T: DeserializeOwned + Send, B: Serialize + Sync>(
    &self,
    url: &str,
    body: &B,
  ) -> Result<T> {
    self.request_json(Method::POST, url, Some(body)).await
  }

  async fn patch<T: DeserializeOwned + Send, B: Serialize + Sync>(
    &self,
    url: &str,
    body: &B,
  ) -> Result<T> {
    self.request_json(Method::PATCH, url, Some(body)).await
  }

  async fn delete(&self, url: &str) -> Result<()> {
    self.execute(Method::DELETE, url, None::<&()>).await?;
    Ok(())
  }
}

/// Map a non-2xx status and error body onto [`Error::Remote`]. Falls back
/// to the status line when the body carries no message.
pub(crate) fn remote_error(status: StatusCode, message: String) -> Error {
  let message = if message.trim().is_empty() {
    status
      .canonical_reason()
      .unwrap_or("request failed")
      .to_string()
  } else {
    message
  };
  Error::Remote {
    status: status.as_u16(),
    message,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remote_error_prefers_the_body_message() {
    let err = remote_error(StatusCode::BAD_REQUEST, "email already taken".into());
    assert_eq!(
      err,
      Error::Remote {
        status: 400,
        message: "email already taken".into()
      }
    );
  }

  #[test]
  fn remote_error_falls_back_to_the_status_line() {
    let err = remote_error(StatusCode::INTERNAL_SERVER_ERROR, "  ".into());
    assert_eq!(
      err,
      Error::Remote {
        status: 500,
        message: "Internal Server Error".into()
      }
    );
  }
}
