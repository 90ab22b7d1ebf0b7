use std::fmt;

/// The error type refresh callbacks return.
///
/// Anything that converts into a boxed error works, including plain strings:
/// `Err("upstream unavailable".into())`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// No Tokio runtime handle was configured and the builder was not called
  /// from within a runtime. Expiration timers and refresh loops need one.
  RuntimeRequired,
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::RuntimeRequired => write!(
        f,
        "a cache requires a Tokio runtime; build it inside one or pass a handle with `runtime()`"
      ),
    }
  }
}

impl std::error::Error for BuildError {}

/// Why a refresh attempt produced no new value. Only used for logging; the
/// scheduler keeps the current value and continues ticking.
#[derive(Debug)]
pub(crate) enum RefreshFailure {
  /// The callback returned an error.
  Callback(BoxError),
  /// The callback panicked.
  Panicked,
  /// The blocking task running the callback was cancelled, which happens
  /// when the runtime shuts down mid-refresh.
  Cancelled,
}

impl fmt::Display for RefreshFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RefreshFailure::Callback(err) => write!(f, "refresher returned an error: {}", err),
      RefreshFailure::Panicked => write!(f, "refresher panicked"),
      RefreshFailure::Cancelled => write!(f, "refresher was cancelled before completing"),
    }
  }
}
