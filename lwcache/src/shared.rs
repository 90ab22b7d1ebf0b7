use crate::entry::CacheEntry;
use crate::handles::Cache;
use crate::metrics::Metrics;
use crate::refresher::Refresher;
use crate::store::EntryTable;
use crate::task::refresh::{self, RefreshRegistry, MIN_REFRESH_INTERVAL};
use crate::task::timer::{ExpirationTimer, FireOutcome, TimerId};
use crate::time::Ttl;

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::runtime::Handle;

/// The internal, thread-safe core of the cache.
///
/// Three pieces of state with three independent locks: the entry table, the
/// refresher registration and the refresh run states. User code (refresh
/// callbacks) is only ever invoked with none of them held.
pub(crate) struct CacheShared<K, V, H> {
  pub(crate) name: String,
  pub(crate) table: EntryTable<K, V, H>,
  pub(crate) refresh_states: RefreshRegistry<K, H>,
  pub(crate) refresher: RwLock<Option<Refresher<K, V, H>>>,
  pub(crate) metrics: Metrics,
  pub(crate) runtime: Handle,
}

impl<K, V, H> fmt::Debug for CacheShared<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("name", &self.name)
      .field("has_refresher", &self.refresher.read().is_some())
      .field("metrics", &self.metrics.snapshot(self.table.len()))
      .finish_non_exhaustive()
  }
}

impl<K, V, H> CacheShared<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(
    name: String,
    initial_capacity: usize,
    hasher: H,
    refresher: Option<Refresher<K, V, H>>,
    runtime: Handle,
  ) -> Self {
    tracing::debug!(cache = %name, initial_capacity, "creating cache");
    Self {
      name,
      table: EntryTable::new(initial_capacity, hasher.clone()),
      refresh_states: RefreshRegistry::new(hasher),
      refresher: RwLock::new(refresher),
      metrics: Metrics::new(),
      runtime,
    }
  }

  // --- Entries ---

  /// Stores `value` under `key`, replacing any previous entry together with
  /// its pending expiration.
  pub(crate) fn insert(self: &Arc<Self>, key: K, value: V, ttl: Ttl) {
    let deadline = ttl.deadline_from(Instant::now());

    // The timer is armed under the write lock so it can never observe the
    // entry it is meant to replace.
    let replaced = {
      let mut map = self.table.write();
      let entry = match deadline {
        Some(at) => CacheEntry::expiring(value, at, self.arm_timer(key.clone(), at)),
        None => CacheEntry::permanent(value),
      };
      map.insert(key, entry)
    };

    Metrics::record(&self.metrics.inserts);
    // Dropping the old entry cancels its timer.
    drop(replaced);
  }

  /// Moves the deadline of an existing entry.
  ///
  /// Returns `false`, changing nothing, when the key is absent or already
  /// past its deadline.
  pub(crate) fn update_expiration<Q>(self: &Arc<Self>, key: &Q, ttl: Ttl) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let now = Instant::now();
    let deadline = ttl.deadline_from(now);

    let detached = {
      let mut map = self.table.write();
      // A permanent entry may need a new timer, which is armed for the
      // stored key.
      let stored_key = match map.get_key_value(key) {
        Some((stored, entry)) if !entry.is_expired(now) => stored.clone(),
        _ => return false,
      };
      let Some(entry) = map.get_mut(key) else {
        return false;
      };
      match deadline {
        Some(at) => {
          if !entry.reset_deadline(at) {
            entry.attach_timer(at, self.arm_timer(stored_key, at));
          }
          None
        }
        None => entry.clear_deadline(),
      }
    };

    Metrics::record(&self.metrics.deadline_updates);
    drop(detached);
    true
  }

  pub(crate) fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let value = self.table.get(key, Instant::now());
    if value.is_some() {
      Metrics::record(&self.metrics.hits);
    } else {
      Metrics::record(&self.metrics.misses);
    }
    value
  }

  pub(crate) fn remove<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.table.remove(key) {
      Some(_entry) => {
        Metrics::record(&self.metrics.deletes);
        true
      }
      None => false,
    }
  }

  pub(crate) fn clear(&self) {
    let drained = self.table.drain();
    tracing::debug!(cache = %self.name, removed = drained.len(), "cache cleared");
  }

  // --- Expiration ---

  /// Spawns the timer that removes `key` at `deadline`.
  ///
  /// The timer task only holds a weak reference to the cache.
  fn arm_timer(self: &Arc<Self>, key: K, deadline: Instant) -> ExpirationTimer {
    let shared = Arc::downgrade(self);
    ExpirationTimer::arm(&self.runtime, deadline, move |timer| {
      let shared = shared.clone();
      let key = key.clone();
      async move {
        match shared.upgrade() {
          Some(shared) => shared.on_timer_fired(&key, timer).await,
          None => FireOutcome::Stale,
        }
      }
    })
  }

  async fn on_timer_fired(&self, key: &K, timer: TimerId) -> FireOutcome {
    let (outcome, removed) = self.table.expire(key, timer).await;
    match outcome {
      FireOutcome::Removed => {
        Metrics::record(&self.metrics.expirations);
        tracing::trace!(cache = %self.name, "entry expired");
      }
      FireOutcome::Rescheduled => {
        tracing::trace!(cache = %self.name, "deadline moved while expiring; rescheduling");
      }
      FireOutcome::Stale => {}
    }
    drop(removed);
    outcome
  }

  // --- Refresh ---

  /// Installs (or with `None`, removes) the refresher used by every key.
  pub(crate) fn install_refresher(&self, refresher: Option<Refresher<K, V, H>>) {
    let installed = refresher.is_some();
    let previous = std::mem::replace(&mut *self.refresher.write(), refresher);
    tracing::debug!(cache = %self.name, installed, "refresher replaced");
    drop(previous);
  }

  /// Switches the refresh loop of `key` on, spawning it if it was off.
  pub(crate) fn start_refresh(self: &Arc<Self>, key: K, interval: Duration) -> bool {
    let interval = interval.max(MIN_REFRESH_INTERVAL);
    let Some(generation) = self.refresh_states.start(&key) else {
      return false;
    };

    tracing::debug!(cache = %self.name, ?interval, generation, "refresh loop started");
    self.runtime.spawn(refresh::run_refresh_loop(
      Arc::downgrade(self),
      key,
      interval,
      generation,
    ));
    true
  }

  pub(crate) fn stop_refresh<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let stopped = self.refresh_states.stop(key);
    if stopped {
      tracing::debug!(cache = %self.name, "refresh loop stopping");
    }
    stopped
  }

  /// One refresh tick for `key`.
  ///
  /// Reads the current value, runs the refresher without any lock held and
  /// writes the result back into the existing entry. The deadline is left as
  /// it is. A failed refresh keeps the current value.
  pub(crate) async fn refresh_once(self: &Arc<Self>, key: &K) {
    let refresher = self.refresher.read().clone();
    let Some(refresher) = refresher else {
      Metrics::record(&self.metrics.refresh_skips);
      tracing::trace!(cache = %self.name, "no refresher installed; skipping tick");
      return;
    };
    let Some(current) = self.table.get(key, Instant::now()) else {
      Metrics::record(&self.metrics.refresh_skips);
      tracing::trace!(cache = %self.name, "key absent; skipping tick");
      return;
    };

    let cache = Cache::from_shared(self.clone());
    match refresher.invoke(cache, key.clone(), current).await {
      Ok(value) => match self.table.commit_refresh(key, value).await {
        Some(_previous) => {
          Metrics::record(&self.metrics.refreshes);
          tracing::trace!(cache = %self.name, "value refreshed");
        }
        None => {
          tracing::trace!(cache = %self.name, "key removed during refresh; result discarded");
        }
      },
      Err(failure) => {
        Metrics::record(&self.metrics.refresh_failures);
        tracing::warn!(cache = %self.name, error = %failure, "refresh failed; keeping current value");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::handles::Cache;
  use std::sync::atomic::Ordering;
  use std::time::Duration;

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_cancelled_expiration_does_not_delay_the_next_one() {
    let cache: Cache<String, u32> = Cache::new("parked_timers");
    cache.set("a".to_string(), 1, Duration::from_millis(40));
    cache.set("b".to_string(), 2, Duration::from_millis(80));

    let shared = cache.shared.clone();
    tokio::task::spawn_blocking(move || {
      let mut map = shared.table.write();
      // Both timers fire and park behind this guard.
      std::thread::sleep(Duration::from_millis(200));
      // Removing `a` aborts its parked timer while the lock is still held.
      drop(map.remove("a"));
      drop(map);
    })
    .await
    .unwrap();

    // No table access in the meantime: `b`'s timer has to get through alone.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(cache.shared.metrics.expirations.load(Ordering::Relaxed), 1);
    assert!(cache.get("b").is_none());
    assert!(cache.is_empty());
  }
}
