use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// Internal counters for a cache. All fields are atomic so the facade and the
/// background tasks can update them without taking any lock.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Lookups ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Writes ---
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) deletes: CachePadded<AtomicU64>,
  pub(crate) deadline_updates: CachePadded<AtomicU64>,

  // --- Expiration ---
  pub(crate) expirations: CachePadded<AtomicU64>,

  // --- Refresh ---
  pub(crate) refreshes: CachePadded<AtomicU64>,
  pub(crate) refresh_failures: CachePadded<AtomicU64>,
  pub(crate) refresh_skips: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      deletes: CachePadded::new(AtomicU64::new(0)),
      deadline_updates: CachePadded::new(AtomicU64::new(0)),
      expirations: CachePadded::new(AtomicU64::new(0)),
      refreshes: CachePadded::new(AtomicU64::new(0)),
      refresh_failures: CachePadded::new(AtomicU64::new(0)),
      refresh_skips: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn record(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
  }

  /// Creates a point-in-time snapshot. `entries` is supplied by the caller
  /// since the table size is not tracked here.
  pub(crate) fn snapshot(&self, entries: usize) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      deletes: self.deletes.load(Ordering::Relaxed),
      deadline_updates: self.deadline_updates.load(Ordering::Relaxed),
      expirations: self.expirations.load(Ordering::Relaxed),
      refreshes: self.refreshes.load(Ordering::Relaxed),
      refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
      refresh_skips: self.refresh_skips.load(Ordering::Relaxed),
      entries,
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups that found a live entry.
  pub hits: u64,
  /// Lookups that found nothing, or an entry past its deadline.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// Calls to `set`, including replacements.
  pub inserts: u64,
  /// Calls to `del` that removed an entry.
  pub deletes: u64,
  /// Calls to `set_expire` that changed an existing entry.
  pub deadline_updates: u64,
  /// Entries removed by their expiration timer.
  pub expirations: u64,
  /// Refresh results written back into the cache.
  pub refreshes: u64,
  /// Refresh callbacks that returned an error or panicked.
  pub refresh_failures: u64,
  /// Refresh ticks that did no work because no refresher was installed or
  /// the key was absent.
  pub refresh_skips: u64,
  /// Entries stored at the time of the snapshot.
  pub entries: usize,
  /// The number of seconds since the cache was created.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("deletes", &self.deletes)
      .field("deadline_updates", &self.deadline_updates)
      .field("expirations", &self.expirations)
      .field("refreshes", &self.refreshes)
      .field("refresh_failures", &self.refresh_failures)
      .field("refresh_skips", &self.refresh_skips)
      .field("entries", &self.entries)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hit_ratio() {
    let metrics = Metrics::new();
    assert_eq!(metrics.snapshot(0).hit_ratio, 0.0);

    for _ in 0..3 {
      Metrics::record(&metrics.hits);
    }
    Metrics::record(&metrics.misses);

    let snapshot = metrics.snapshot(7);
    assert_eq!(snapshot.hits, 3);
    assert_eq!(snapshot.misses, 1);
    assert_eq!(snapshot.hit_ratio, 0.75);
    assert_eq!(snapshot.entries, 7);
  }
}
