use crate::entry::CacheEntry;
use crate::sync::{HybridRwLock, HybridWriteGuard};
use crate::task::timer::{FireOutcome, TimerId};

use core::fmt;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Instant;

pub(crate) type EntryMap<K, V, H> = HashMap<K, CacheEntry<V>, H>;

/// The key -> entry map behind a single reader/writer lock.
///
/// Every read and write of cache contents goes through this lock. Methods
/// here never call user code; removed entries are handed back to the caller
/// so their values (and timers) are dropped after the lock is released.
pub(crate) struct EntryTable<K, V, H> {
  map: HybridRwLock<EntryMap<K, V, H>>,
}

impl<K, V, H> fmt::Debug for EntryTable<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EntryTable").finish_non_exhaustive()
  }
}

impl<K, V, H> EntryTable<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher,
{
  pub(crate) fn new(initial_capacity: usize, hasher: H) -> Self {
    Self {
      map: HybridRwLock::new(HashMap::with_capacity_and_hasher(initial_capacity, hasher)),
    }
  }

  /// Exclusive access for operations that arm timers while holding the lock.
  #[inline]
  pub(crate) fn write(&self) -> HybridWriteGuard<'_, EntryMap<K, V, H>> {
    self.map.write()
  }

  /// Returns the live value for `key`. Entries past their deadline read as
  /// absent while their timer is on its way to remove them.
  pub(crate) fn get<Q>(&self, key: &Q, now: Instant) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let guard = self.map.read();
    match guard.get(key) {
      Some(entry) if !entry.is_expired(now) => Some(entry.value()),
      _ => None,
    }
  }

  pub(crate) fn contains_key<Q>(&self, key: &Q, now: Instant) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self
      .map
      .read()
      .get(key)
      .is_some_and(|entry| !entry.is_expired(now))
  }

  /// Number of stored entries, including any whose removal is in flight.
  pub(crate) fn len(&self) -> usize {
    self.map.read().len()
  }

  pub(crate) fn remove<Q>(&self, key: &Q) -> Option<CacheEntry<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.write().remove(key)
  }

  /// Empties the table, returning every entry that was stored.
  pub(crate) fn drain(&self) -> Vec<CacheEntry<V>> {
    self.map.write().drain().map(|(_, entry)| entry).collect()
  }

  /// Removes `key` on behalf of the timer identified by `timer`.
  ///
  /// The entry is only removed if it is still owned by that timer and its
  /// deadline has passed; a timer that lost a race with `set`, `del` or
  /// `set_expire` finds nothing to do.
  pub(crate) async fn expire(&self, key: &K, timer: TimerId) -> (FireOutcome, Option<CacheEntry<V>>) {
    let mut guard = self.map.write_async().await;
    let outcome = match guard.get(key) {
      Some(entry) if entry.timer_id() == Some(timer) => {
        if entry.is_expired(Instant::now()) {
          FireOutcome::Removed
        } else {
          FireOutcome::Rescheduled
        }
      }
      _ => FireOutcome::Stale,
    };

    let removed = match outcome {
      FireOutcome::Removed => guard.remove(key),
      _ => None,
    };
    (outcome, removed)
  }

  /// Writes a refreshed value into an existing, unexpired entry.
  ///
  /// Returns the previous value, or `None` when the key is gone, in which
  /// case nothing is written.
  pub(crate) async fn commit_refresh(&self, key: &K, value: V) -> Option<Arc<V>> {
    let mut guard = self.map.write_async().await;
    match guard.get_mut(key) {
      Some(entry) if !entry.is_expired(Instant::now()) => Some(entry.replace_value(value)),
      _ => None,
    }
  }
}
