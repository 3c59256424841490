//! Keyed result cache with in-flight deduplication.
//!
//! Each Resource Gateway owns one cache per entity kind; entries are
//! keyed by the operation and its arguments (`"invoice:list"`,
//! `"invoice:get:7"`). Concurrent identical fetches are collapsed onto a
//! single underlying request by sharing the future. Mutations invalidate
//! by evicting the owning gateway's entries, so the next fetch goes back
//! to the network; nothing here refetches on its own.

use crate::error::Result;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T>>>;

pub struct RequestCache<T: Clone> {
  entries: Arc<Mutex<HashMap<String, T>>>,
  in_flight: Arc<Mutex<HashMap<String, SharedFetch<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> RequestCache<T> {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Fetch through the cache.
  ///
  /// 1. A cached entry for `key` is returned immediately.
  /// 2. An identical in-flight request is joined instead of duplicated.
  /// 3. Otherwise the fetcher runs; a success is stored under `key`.
  ///
  /// Errors are never cached, so a failed read can simply be retried.
  pub async fn fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    if let Some(hit) = self.entries.lock().await.get(key) {
      tracing::debug!(key, "cache hit");
      return Ok(hit.clone());
    }

    let fut = {
      let mut in_flight = self.in_flight.lock().await;
      if let Some(existing) = in_flight.get(key) {
        tracing::debug!(key, "joining in-flight request");
        existing.clone()
      } else {
        let fut = fetcher().boxed().shared();
        in_flight.insert(key.to_string(), fut.clone());
        fut
      }
    };

    let result = fut.clone().await;
    {
      // An invalidate-then-fetch may have replaced the entry while we
      // awaited; only the future we actually ran to completion is evicted.
      let mut in_flight = self.in_flight.lock().await;
      if in_flight.get(key).is_some_and(|current| current.ptr_eq(&fut)) {
        in_flight.remove(key);
      }
    }

    if let Ok(value) = &result {
      self.entries.lock().await.insert(key.to_string(), value.clone());
    }

    result
  }

  /// Evict a single entry.
  pub async fn invalidate(&self, key: &str) {
    self.entries.lock().await.remove(key);
  }

  /// Evict everything this cache holds. Called by mutations on the owning
  /// gateway (the whole entity kind is the invalidation tag).
  pub async fn invalidate_all(&self) {
    self.entries.lock().await.clear();
  }
}

impl<T: Clone> Clone for RequestCache<T> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}

impl<T: Clone + Send + Sync + 'static> Default for RequestCache<T> {
  fn default() -> Self {
    Self::new()
  }
}
