//! Poll-driven fetch handle for shells that render from a tick loop.
//!
//! The list and detail controllers await their gateways inline; a shell
//! with a frame loop instead owns a [`Query`] per view, kicks it off
//! with [`Query::fetch`], and calls [`Query::poll`] once per tick. A
//! request discarded mid-flight (the query dropped, or restarted via
//! [`Query::refetch`]) resolves into a closed channel and its stale
//! result is never applied anywhere.
//!
//! ```ignore
//! let gateways = gateways.clone();
//! let mut invoices = Query::new(move || {
//!   let gateways = gateways.clone();
//!   async move { gateways.invoices.list().await }
//! });
//! invoices.fetch();
//!
//! // Per tick:
//! if invoices.poll() {
//!   request_redraw();
//! }
//! ```

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Where a query is in its lifecycle.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Never started.
  Idle,
  /// Request in flight.
  Loading,
  Success(T),
  Error(Error),
}

impl<T> QueryState<T> {
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&Error> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type Fetcher<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// One view's fetch lifecycle: the fetching closure, the current
/// [`QueryState`], and a staleness clock for revisit decisions.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: Fetcher<T>,
  pending: Option<oneshot::Receiver<Result<T>>>,
  fetched_at: Option<Instant>,
  stale_after: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// `fetcher` is called once per `fetch`/`refetch`; the request runs
  /// on the tokio runtime while the query stays with its view.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || fetcher().boxed()),
      pending: None,
      fetched_at: None,
      stale_after: Duration::from_secs(60),
    }
  }

  /// Age after which a successful result counts as stale.
  pub fn with_stale_after(mut self, window: Duration) -> Self {
    self.stale_after = window;
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn error(&self) -> Option<&Error> {
    self.state.error()
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, QueryState::Loading)
  }

  /// Successful data older than the stale window. Shells use this to
  /// decide whether a revisited view warrants a [`refetch`](Self::refetch).
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map_or(true, |at| at.elapsed() > self.stale_after),
      _ => false,
    }
  }

  /// Start a request unless one is already in flight.
  pub fn fetch(&mut self) {
    if self.is_loading() {
      return;
    }
    self.begin();
  }

  /// Discard any pending request and start a fresh one. The discarded
  /// request's eventual result is dropped, never applied.
  pub fn refetch(&mut self) {
    self.pending = None;
    self.begin();
  }

  /// Check the pending request for completion. Returns `true` when the
  /// state changed; call once per tick.
  pub fn poll(&mut self) -> bool {
    let Some(pending) = &mut self.pending else {
      return false;
    };

    match pending.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.pending = None;
        true
      }
      Ok(Err(e)) => {
        self.state = QueryState::Error(e);
        self.pending = None;
        true
      }
      Err(oneshot::error::TryRecvError::Empty) => false,
      Err(oneshot::error::TryRecvError::Closed) => {
        // The spawned request was torn down without answering.
        self.state = QueryState::Error(Error::Cancelled);
        self.pending = None;
        true
      }
    }
  }

  fn begin(&mut self) {
    let (tx, rx) = oneshot::channel();
    self.pending = Some(rx);
    self.state = QueryState::Loading;

    let request = (self.fetcher)();
    tokio::spawn(async move {
      // A closed receiver means the query moved on; drop the result.
      let _ = tx.send(request.await);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_after", &self.stale_after)
      .finish_non_exhaustive()
  }
}
