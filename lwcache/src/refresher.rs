use crate::error::{BoxError, RefreshFailure};
use crate::handles::Cache;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

pub(crate) type SyncRefreshFn<K, V, H> =
  dyn Fn(&Cache<K, V, H>, &K, &V) -> Result<V, BoxError> + Send + Sync;

pub(crate) type AsyncRefreshFn<K, V, H> =
  dyn Fn(Cache<K, V, H>, K, Arc<V>) -> BoxFuture<'static, Result<V, BoxError>> + Send + Sync;

/// The cache-wide function that recomputes a key's value on each refresh tick.
///
/// Both variants receive a handle to the cache so the callback can call back
/// into it (for example to extend the TTL of the key it is refreshing)
/// without capturing a handle of its own, which would keep the cache alive
/// forever.
pub(crate) enum Refresher<K, V, H> {
  /// Runs on the runtime's blocking pool; it may block for as long as it likes.
  Sync(Arc<SyncRefreshFn<K, V, H>>),
  /// Awaited on the refresh loop's own task.
  Async(Arc<AsyncRefreshFn<K, V, H>>),
}

impl<K, V, H> Clone for Refresher<K, V, H> {
  fn clone(&self) -> Self {
    match self {
      Refresher::Sync(f) => Refresher::Sync(f.clone()),
      Refresher::Async(f) => Refresher::Async(f.clone()),
    }
  }
}

impl<K, V, H> Refresher<K, V, H>
where
  K: Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: Send + Sync + 'static,
{
  /// Wraps a function of `(key, current value)`.
  pub(crate) fn from_fn<F>(f: F) -> Self
  where
    F: Fn(&K, &V) -> Result<V, BoxError> + Send + Sync + 'static,
  {
    Refresher::Sync(Arc::new(move |_cache: &Cache<K, V, H>, key: &K, value: &V| f(key, value)))
  }

  /// Wraps a function of `(cache, key, current value)`.
  pub(crate) fn with_cache<F>(f: F) -> Self
  where
    F: Fn(&Cache<K, V, H>, &K, &V) -> Result<V, BoxError> + Send + Sync + 'static,
  {
    Refresher::Sync(Arc::new(f))
  }

  /// Wraps an asynchronous function of `(cache, key, current value)`.
  pub(crate) fn from_async<F, Fut>(f: F) -> Self
  where
    F: Fn(Cache<K, V, H>, K, Arc<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
  {
    let refresh_fn = move |cache, key, value| {
      Box::pin(f(cache, key, value)) as BoxFuture<'static, Result<V, BoxError>>
    };
    Refresher::Async(Arc::new(refresh_fn))
  }

  /// Runs the refresher once for `key`.
  ///
  /// Must be called from within the cache's runtime. A panicking callback is
  /// reported as a failure rather than unwinding into the refresh loop.
  pub(crate) async fn invoke(
    &self,
    cache: Cache<K, V, H>,
    key: K,
    current: Arc<V>,
  ) -> Result<V, RefreshFailure> {
    match self {
      Refresher::Sync(f) => {
        let f = f.clone();
        let outcome = tokio::task::spawn_blocking(move || f(&cache, &key, &*current)).await;
        match outcome {
          Ok(result) => result.map_err(RefreshFailure::Callback),
          Err(join_err) if join_err.is_panic() => Err(RefreshFailure::Panicked),
          Err(_) => Err(RefreshFailure::Cancelled),
        }
      }
      Refresher::Async(f) => {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| f(cache, key, current))) {
          Ok(future) => future,
          Err(_) => return Err(RefreshFailure::Panicked),
        };
        match AssertUnwindSafe(future).catch_unwind().await {
          Ok(result) => result.map_err(RefreshFailure::Callback),
          Err(_) => Err(RefreshFailure::Panicked),
        }
      }
    }
  }
}
