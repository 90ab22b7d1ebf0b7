use crate::error::{BoxError, BuildError};
use crate::handles::Cache;
use crate::refresher::Refresher;
use crate::shared::CacheShared;

use core::fmt;
use std::future::Future;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use tokio::runtime::Handle;

/// A builder for creating [`Cache`] instances.
///
/// ```rust,no_run
/// # use lwcache::CacheBuilder;
/// # fn demo(runtime: &tokio::runtime::Runtime) -> Result<(), lwcache::BuildError> {
/// let cache = CacheBuilder::<String, u64>::new("counters")
///   .initial_capacity(1024)
///   .runtime(runtime.handle().clone())
///   .refresher(|_key, count| Ok(count + 1))
///   .build()?;
/// # Ok(())
/// # }
/// ```
pub struct CacheBuilder<K, V, H = ahash::RandomState> {
  name: String,
  initial_capacity: usize,
  hasher: H,
  runtime: Option<Handle>,
  refresher: Option<Refresher<K, V, H>>,
}

impl<K, V, H> fmt::Debug for CacheBuilder<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("name", &self.name)
      .field("initial_capacity", &self.initial_capacity)
      .field("has_runtime", &self.runtime.is_some())
      .field("has_refresher", &self.refresher.is_some())
      .finish_non_exhaustive()
  }
}

impl<K, V> CacheBuilder<K, V, ahash::RandomState> {
  /// Creates a builder for a cache called `name`, hashing keys with `ahash`.
  pub fn new(name: impl Into<String>) -> Self {
    Self::with_hasher(name, ahash::RandomState::new())
  }
}

// --- General Configuration Methods ---
impl<K, V, H> CacheBuilder<K, V, H> {
  /// Creates a builder that hashes keys with `hasher`.
  pub fn with_hasher(name: impl Into<String>, hasher: H) -> Self {
    Self {
      name: name.into(),
      initial_capacity: 0,
      hasher,
      runtime: None,
      refresher: None,
    }
  }

  /// Pre-allocates room for this many entries.
  pub fn initial_capacity(mut self, capacity: usize) -> Self {
    self.initial_capacity = capacity;
    self
  }

  /// Runs expiration timers and refresh loops on this runtime instead of
  /// the one `build` is called from. Required when building outside of a
  /// Tokio runtime.
  pub fn runtime(mut self, handle: Handle) -> Self {
    self.runtime = Some(handle);
    self
  }
}

// --- Refresher & Build Methods ---
impl<K, V, H> CacheBuilder<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Installs a refresher up front. See [`Cache::set_refresher`].
  pub fn refresher<F>(mut self, refresher: F) -> Self
  where
    F: Fn(&K, &V) -> Result<V, BoxError> + Send + Sync + 'static,
  {
    self.refresher = Some(Refresher::from_fn(refresher));
    self
  }

  /// See [`Cache::set_refresher_with_cache`].
  pub fn refresher_with_cache<F>(mut self, refresher: F) -> Self
  where
    F: Fn(&Cache<K, V, H>, &K, &V) -> Result<V, BoxError> + Send + Sync + 'static,
  {
    self.refresher = Some(Refresher::with_cache(refresher));
    self
  }

  /// See [`Cache::set_async_refresher`].
  pub fn async_refresher<F, Fut>(mut self, refresher: F) -> Self
  where
    F: Fn(Cache<K, V, H>, K, Arc<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
  {
    self.refresher = Some(Refresher::from_async(refresher));
    self
  }

  /// Builds the cache.
  ///
  /// # Errors
  ///
  /// Returns [`BuildError::RuntimeRequired`] if no runtime handle was given
  /// and this is not called from within a Tokio runtime.
  pub fn build(self) -> Result<Cache<K, V, H>, BuildError> {
    let runtime = match &self.runtime {
      Some(handle) => handle.clone(),
      None => Handle::try_current().map_err(|_| BuildError::RuntimeRequired)?,
    };
    Ok(self.build_on(runtime))
  }

  /// Builds the cache on `runtime`, ignoring any handle set with `runtime()`.
  pub(crate) fn build_on(self, runtime: Handle) -> Cache<K, V, H> {
    let shared = CacheShared::new(
      self.name,
      self.initial_capacity,
      self.hasher,
      self.refresher,
      runtime,
    );
    Cache::from_shared(Arc::new(shared))
  }
}
