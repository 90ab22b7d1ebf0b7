use crate::builder::CacheBuilder;
use crate::error::BoxError;
use crate::metrics::MetricsSnapshot;
use crate::refresher::Refresher;
use crate::runtime;
use crate::shared::CacheShared;
use crate::time::Ttl;

use std::borrow::Borrow;
use std::fmt;
use std::future::Future;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

/// Read access to a cache, as a trait.
///
/// Lets code that only looks values up accept any cache (or a test double)
/// without naming its hasher or being able to mutate it.
pub trait Getter<K, V> {
  /// Returns the live value for `key`, if any.
  fn get(&self, key: &K) -> Option<Arc<V>>;
}

/// A thread-safe cache whose entries expire individually and can be kept
/// fresh by a background refresher.
///
/// `Cache` is a cheap handle: clones share the same entries, refresher and
/// background tasks. Values are stored in an `Arc<V>`, so `V` does not need
/// to be `Clone`.
///
/// Expiration timers and refresh loops run on the Tokio runtime the cache
/// was built on. Dropping the last handle cancels every pending expiration
/// and ends every refresh loop at its next tick.
pub struct Cache<K, V, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, H>>,
}

impl<K, V, H> Clone for Cache<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K, V, H> fmt::Debug for Cache<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache").field("shared", &self.shared).finish()
  }
}

impl<K, V> Cache<K, V, ahash::RandomState>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Creates an empty cache.
  ///
  /// Timers and refresh loops run on the current Tokio runtime. Called
  /// outside of one, the cache uses a small background runtime shared by all
  /// caches created that way. Use [`Cache::builder`] to pick the runtime
  /// explicitly.
  ///
  /// # Panics
  ///
  /// Only if the background runtime is needed and the operating system
  /// refuses to start its threads.
  pub fn new(name: impl Into<String>) -> Self {
    let runtime = match runtime::current_or_background() {
      Ok(handle) => handle,
      Err(err) => panic!("failed to start the cache background runtime: {}", err),
    };
    Self::builder(name).build_on(runtime)
  }

  /// Starts configuring a cache.
  pub fn builder(name: impl Into<String>) -> CacheBuilder<K, V> {
    CacheBuilder::new(name)
  }
}

impl<K, V, H> Cache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn from_shared(shared: Arc<CacheShared<K, V, H>>) -> Self {
    Self { shared }
  }

  /// The name the cache was created with. Appears in every log event.
  pub fn name(&self) -> &str {
    &self.shared.name
  }

  /// Stores `value` under `key`.
  ///
  /// Any previous entry is replaced, and its pending expiration cancelled.
  /// With [`Ttl::NoExpire`] the entry stays until deleted; otherwise it is
  /// removed once `ttl` has elapsed.
  pub fn set(&self, key: K, value: V, ttl: impl Into<Ttl>) {
    self.shared.insert(key, value, ttl.into());
  }

  /// Returns the value stored under `key`.
  ///
  /// An entry whose deadline has passed is reported as absent even if its
  /// timer has not removed it yet.
  pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.get(key)
  }

  /// Removes `key` and cancels its pending expiration.
  ///
  /// Returns `true` if an entry was removed. Deleting an absent key is a
  /// no-op. A refresh loop running for the key is not stopped; see
  /// [`Cache::stop_refresher`].
  pub fn del<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.remove(key)
  }

  /// Gives an existing entry a new time-to-live, measured from now.
  ///
  /// The value is untouched. [`Ttl::NoExpire`] makes the entry permanent.
  /// Returns `false`, doing nothing, if the key is absent.
  pub fn set_expire<Q>(&self, key: &Q, ttl: impl Into<Ttl>) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.update_expiration(key, ttl.into())
  }

  /// Installs the refresher used by every key's refresh loop, replacing any
  /// previous one.
  ///
  /// The function receives the key and its current value and returns the
  /// new value. It runs on the runtime's blocking pool, so it may perform
  /// slow or blocking work. An error keeps the current value.
  pub fn set_refresher<F>(&self, refresher: F)
  where
    F: Fn(&K, &V) -> Result<V, BoxError> + Send + Sync + 'static,
  {
    self.shared.install_refresher(Some(Refresher::from_fn(refresher)));
  }

  /// Like [`Cache::set_refresher`], but the function also receives a handle
  /// to this cache, so it can adjust the entry it refreshes.
  ///
  /// ```rust,no_run
  /// # use lwcache::Cache;
  /// # use std::time::Duration;
  /// # fn demo(cache: &Cache<String, u64>) {
  /// cache.set_refresher_with_cache(|cache, key, hits| {
  ///   cache.set_expire(key, Duration::from_secs(60));
  ///   Ok(hits + 1)
  /// });
  /// # }
  /// ```
  pub fn set_refresher_with_cache<F>(&self, refresher: F)
  where
    F: Fn(&Cache<K, V, H>, &K, &V) -> Result<V, BoxError> + Send + Sync + 'static,
  {
    self.shared.install_refresher(Some(Refresher::with_cache(refresher)));
  }

  /// Installs an asynchronous refresher. The returned future is awaited on
  /// the key's refresh task.
  pub fn set_async_refresher<F, Fut>(&self, refresher: F)
  where
    F: Fn(Cache<K, V, H>, K, Arc<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
  {
    self.shared.install_refresher(Some(Refresher::from_async(refresher)));
  }

  /// Starts refreshing `key` every `interval`, the first time one interval
  /// from now.
  ///
  /// Returns `false` if a refresh loop for `key` is already running, in which
  /// case nothing changes (including its interval). The key does not need to
  /// be present: ticks that find no entry, or no installed refresher, do
  /// nothing and the loop waits for the next one.
  pub fn start_refresher(&self, key: K, interval: Duration) -> bool {
    self.shared.start_refresh(key, interval)
  }

  /// Stops the refresh loop of `key`.
  ///
  /// The loop ends at its next tick. A refresh already in progress still
  /// completes and stores its result. Returns `false` if no loop was running.
  pub fn stop_refresher<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.stop_refresh(key)
  }

  /// Whether a refresh loop is switched on for `key`.
  pub fn is_refreshing<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.refresh_states.is_running(key)
  }

  /// Whether `key` holds a live entry. Does not count as a lookup in the
  /// metrics.
  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.table.contains_key(key, std::time::Instant::now())
  }

  /// Number of stored entries. May include entries whose deadline has just
  /// passed and whose removal is in flight.
  pub fn len(&self) -> usize {
    self.shared.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Removes every entry and cancels their expirations. Refresh loops keep
  /// running.
  pub fn clear(&self) {
    self.shared.clear();
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot(self.shared.table.len())
  }
}

impl<K, V, H> Getter<K, V> for Cache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  fn get(&self, key: &K) -> Option<Arc<V>> {
    self.shared.get(key)
  }
}
