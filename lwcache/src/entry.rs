use crate::task::timer::{ExpirationTimer, TimerId};

use std::sync::Arc;
use std::time::Instant;

/// A value in the cache together with its expiration state.
///
/// `expires_at` and `timer` are kept in lockstep: a permanent entry has
/// neither, an expiring entry has both and the timer sleeps towards
/// `expires_at`. The entry owns its timer, so replacing or dropping the entry
/// cancels any pending deletion.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  value: Arc<V>,
  expires_at: Option<Instant>,
  timer: Option<ExpirationTimer>,
}

impl<V> CacheEntry<V> {
  /// Creates an entry that is never removed by a timer.
  pub(crate) fn permanent(value: V) -> Self {
    Self {
      value: Arc::new(value),
      expires_at: None,
      timer: None,
    }
  }

  /// Creates an entry removed by `timer` at `expires_at`.
  pub(crate) fn expiring(value: V, expires_at: Instant, timer: ExpirationTimer) -> Self {
    debug_assert_eq!(timer.deadline(), expires_at);
    Self {
      value: Arc::new(value),
      expires_at: Some(expires_at),
      timer: Some(timer),
    }
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  #[cfg(test)]
  pub(crate) fn expires_at(&self) -> Option<Instant> {
    self.expires_at
  }

  /// True once the deadline has passed, even if the timer has not yet
  /// removed the entry.
  #[inline]
  pub(crate) fn is_expired(&self, now: Instant) -> bool {
    self.expires_at.is_some_and(|at| now >= at)
  }

  #[inline]
  pub(crate) fn timer_id(&self) -> Option<TimerId> {
    self.timer.as_ref().map(ExpirationTimer::id)
  }

  /// Swaps in a new value, leaving the deadline and timer untouched.
  /// Returns the previous value so it can be dropped outside the table lock.
  pub(crate) fn replace_value(&mut self, value: V) -> Arc<V> {
    std::mem::replace(&mut self.value, Arc::new(value))
  }

  /// Moves an existing timer to `expires_at`.
  ///
  /// Returns `false` when the entry has no timer yet; the caller must then
  /// arm one with [`CacheEntry::attach_timer`].
  pub(crate) fn reset_deadline(&mut self, expires_at: Instant) -> bool {
    match &self.timer {
      Some(timer) => {
        timer.reset(expires_at);
        self.expires_at = Some(expires_at);
        true
      }
      None => false,
    }
  }

  /// Gives a permanent entry a deadline and the timer that enforces it.
  pub(crate) fn attach_timer(&mut self, expires_at: Instant, timer: ExpirationTimer) {
    debug_assert!(self.timer.is_none());
    debug_assert_eq!(timer.deadline(), expires_at);
    self.expires_at = Some(expires_at);
    self.timer = Some(timer);
  }

  /// Makes the entry permanent. The detached timer is returned so the caller
  /// decides when it is dropped (and thereby cancelled).
  pub(crate) fn clear_deadline(&mut self) -> Option<ExpirationTimer> {
    self.expires_at = None;
    self.timer.take()
  }
}
