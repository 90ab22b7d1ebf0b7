use crate::shared::CacheShared;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Shortest interval a refresh loop runs at; shorter requests are raised to it.
pub(crate) const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
struct RunState {
  running: bool,
  /// Bumped on every off -> on transition. A loop only keeps going while its
  /// own generation is the current one, so a stop followed by a quick start
  /// never leaves the old loop running next to the new one.
  generation: u64,
}

/// Per-key on/off switches for the refresh loops.
///
/// Guarded by its own lock, separate from the entry table, so a refresh
/// callback can use the cache freely while loops are being toggled.
pub(crate) struct RefreshRegistry<K, H> {
  states: Mutex<HashMap<K, RunState, H>>,
}

impl<K, H> RefreshRegistry<K, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher,
{
  pub(crate) fn new(hasher: H) -> Self {
    Self {
      states: Mutex::new(HashMap::with_hasher(hasher)),
    }
  }

  /// Switches the loop for `key` on.
  ///
  /// Returns the generation of the loop the caller must spawn, or `None` if a
  /// loop is already running for this key.
  pub(crate) fn start(&self, key: &K) -> Option<u64> {
    let mut states = self.states.lock();
    match states.get_mut(key) {
      Some(state) if state.running => None,
      Some(state) => {
        state.running = true;
        state.generation += 1;
        Some(state.generation)
      }
      None => {
        states.insert(
          key.clone(),
          RunState {
            running: true,
            generation: 1,
          },
        );
        Some(1)
      }
    }
  }

  /// Switches the loop for `key` off. Returns `true` if it was running.
  pub(crate) fn stop<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.states.lock().get_mut(key) {
      Some(state) if state.running => {
        state.running = false;
        true
      }
      _ => false,
    }
  }

  pub(crate) fn is_running<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.states.lock().get(key).is_some_and(|state| state.running)
  }

  /// Whether the loop of `generation` should keep ticking.
  pub(crate) fn is_current(&self, key: &K, generation: u64) -> bool {
    self
      .states
      .lock()
      .get(key)
      .is_some_and(|state| state.running && state.generation == generation)
  }
}

/// The recurring refresh task of one key.
///
/// Ticks every `interval` until its run state is switched off or replaced by
/// a newer generation. A missing entry does not end the loop; the tick is
/// skipped and the loop waits for the next one. Only a weak reference to the
/// cache is held between ticks, so dropping the cache also ends the loop.
pub(crate) async fn run_refresh_loop<K, V, H>(
  shared: Weak<CacheShared<K, V, H>>,
  key: K,
  interval: Duration,
  generation: u64,
) where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  let mut ticker = time::interval_at(Instant::now() + interval, interval);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    ticker.tick().await;

    let Some(shared) = shared.upgrade() else {
      return;
    };
    if !shared.refresh_states.is_current(&key, generation) {
      tracing::debug!(cache = %shared.name, generation, "refresh loop stopped");
      return;
    }
    shared.refresh_once(&key).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registry() -> RefreshRegistry<&'static str, ahash::RandomState> {
    RefreshRegistry::new(ahash::RandomState::new())
  }

  #[test]
  fn test_start_is_idempotent_while_running() {
    let registry = registry();
    assert_eq!(registry.start(&"k"), Some(1));
    assert_eq!(registry.start(&"k"), None);
    assert!(registry.is_running(&"k"));
    assert!(registry.is_current(&"k", 1));
  }

  #[test]
  fn test_restart_bumps_the_generation() {
    let registry = registry();
    assert_eq!(registry.start(&"k"), Some(1));
    assert!(registry.stop(&"k"));
    assert!(!registry.is_current(&"k", 1));

    assert_eq!(registry.start(&"k"), Some(2));
    assert!(!registry.is_current(&"k", 1), "old loop must retire");
    assert!(registry.is_current(&"k", 2));
  }

  #[test]
  fn test_stop_unknown_key_is_a_no_op() {
    let registry = registry();
    assert!(!registry.stop(&"missing"));
    assert!(!registry.is_running(&"missing"));
    assert!(registry.start(&"other").is_some());
    assert!(registry.stop(&"other"));
    assert!(!registry.stop(&"other"));
  }
}
