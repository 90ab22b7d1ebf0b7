#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use lwcache::Cache;

static TRACING: Once = Once::new();

/// Routes `lwcache` events to the test harness output. Set `RUST_LOG` to
/// change the level (e.g. `RUST_LOG=lwcache=trace`).
pub fn init_tracing() {
  TRACING.call_once(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
          .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lwcache=debug")),
      )
      .with_test_writer()
      .try_init();
  });
}

/// Creates a cache on the current runtime with logging enabled.
pub fn build_test_cache<V>(name: &str) -> Cache<String, V>
where
  V: Send + Sync + 'static,
{
  init_tracing();
  Cache::new(name)
}

pub fn key(name: &str) -> String {
  name.to_string()
}

/// The refresh interval used by scheduling tests, and the offset at which
/// they sample: halfway between two ticks.
pub const TICK: Duration = Duration::from_millis(200);
pub const HALF_TICK: Duration = Duration::from_millis(100);
