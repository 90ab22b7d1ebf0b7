use std::fmt;
use std::time::{Duration, Instant};

/// Shorthand for [`Ttl::NoExpire`].
pub const NO_EXPIRE: Ttl = Ttl::NoExpire;

/// How long an entry stays in the cache before it is removed automatically.
///
/// A plain `Duration` converts into `Ttl::After`, so most call sites can pass
/// a duration directly:
///
/// ```rust,no_run
/// # use lwcache::{Cache, Ttl};
/// # use std::time::Duration;
/// # fn demo(cache: &Cache<&'static str, u32>) {
/// cache.set("session", 1, Duration::from_secs(30));
/// cache.set("config", 2, Ttl::NoExpire);
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
  /// The entry is never removed by a timer; only `del` or `clear` remove it.
  NoExpire,
  /// The entry is removed once this much time has passed.
  After(Duration),
}

impl Ttl {
  /// Returns `true` for the never-expiring sentinel.
  #[inline]
  pub fn is_no_expire(&self) -> bool {
    matches!(self, Ttl::NoExpire)
  }

  /// Computes the absolute deadline for this TTL, measured from `now`.
  ///
  /// Returns `None` for `NoExpire`, and also for durations so large that the
  /// deadline cannot be represented, which behave as "never".
  #[inline]
  pub(crate) fn deadline_from(self, now: Instant) -> Option<Instant> {
    match self {
      Ttl::NoExpire => None,
      Ttl::After(duration) => now.checked_add(duration),
    }
  }
}

impl From<Duration> for Ttl {
  fn from(duration: Duration) -> Self {
    Ttl::After(duration)
  }
}

impl From<Option<Duration>> for Ttl {
  fn from(duration: Option<Duration>) -> Self {
    duration.map_or(Ttl::NoExpire, Ttl::After)
  }
}

impl fmt::Display for Ttl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Ttl::NoExpire => write!(f, "no expiration"),
      Ttl::After(duration) => write!(f, "expires after {:?}", duration),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_no_expire_has_no_deadline() {
    assert!(NO_EXPIRE.is_no_expire());
    assert_eq!(Ttl::NoExpire.deadline_from(Instant::now()), None);
  }

  #[test]
  fn test_deadline_is_relative_to_now() {
    let now = Instant::now();
    let ttl = Ttl::from(Duration::from_millis(250));
    assert_eq!(ttl.deadline_from(now), Some(now + Duration::from_millis(250)));
  }

  #[test]
  fn test_unrepresentable_deadline_behaves_as_no_expire() {
    let ttl = Ttl::After(Duration::MAX);
    assert_eq!(ttl.deadline_from(Instant::now()), None);
  }

  #[test]
  fn test_option_conversion() {
    assert_eq!(Ttl::from(None), Ttl::NoExpire);
    assert_eq!(
      Ttl::from(Some(Duration::from_secs(1))),
      Ttl::After(Duration::from_secs(1))
    );
  }
}
