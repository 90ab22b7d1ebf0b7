mod common;

use common::init_tracing;
use lwcache::{BuildError, Cache, CacheBuilder, NO_EXPIRE};
use std::time::Duration;

#[test]
fn test_build_outside_runtime_requires_a_handle() {
  let result = CacheBuilder::<String, u32>::new("no_runtime").build();
  assert!(matches!(result, Err(BuildError::RuntimeRequired)));
}

#[test]
fn test_new_outside_runtime_uses_background_runtime() {
  init_tracing();
  let cache: Cache<String, u64> = Cache::new("background_runtime");
  let other: Cache<String, u64> = Cache::new("background_runtime_2");

  cache.set("short".to_string(), 1, Duration::from_millis(50));
  cache.set("counter".to_string(), 0, NO_EXPIRE);
  cache.set_refresher(|_key, value| Ok(value + 1));
  assert!(cache.start_refresher("counter".to_string(), Duration::from_millis(50)));
  other.set("short".to_string(), 2, Duration::from_millis(50));

  std::thread::sleep(Duration::from_millis(300));
  assert!(cache.get("short").is_none());
  assert!(other.get("short").is_none());
  assert!(*cache.get("counter").unwrap() >= 2);
  assert_eq!(cache.metrics().expirations, 1);
}

#[test]
fn test_build_with_explicit_runtime() {
  init_tracing();
  let runtime = tokio::runtime::Builder::new_multi_thread()
    .worker_threads(2)
    .enable_time()
    .build()
    .unwrap();

  let cache = CacheBuilder::<String, u32>::new("explicit_runtime")
    .initial_capacity(64)
    .runtime(runtime.handle().clone())
    .build()
    .unwrap();

  assert_eq!(cache.name(), "explicit_runtime");
  cache.set("short".to_string(), 1, Duration::from_millis(50));
  cache.set("long".to_string(), 2, NO_EXPIRE);

  // Timers run on the runtime's workers while this thread just sleeps.
  std::thread::sleep(Duration::from_millis(250));
  assert!(cache.get("short").is_none());
  assert_eq!(cache.get("long").as_deref(), Some(&2));
}

#[tokio::test]
async fn test_builder_installs_refresher() {
  init_tracing();
  let cache = CacheBuilder::<String, u32>::new("builder_refresher")
    .refresher(|_key, value| Ok(value + 1))
    .build()
    .unwrap();

  cache.set("k".to_string(), 0, NO_EXPIRE);
  assert!(cache.start_refresher("k".to_string(), Duration::from_millis(50)));
  tokio::time::sleep(Duration::from_millis(180)).await;
  assert!(*cache.get("k").unwrap() >= 2);
}

#[tokio::test]
async fn test_custom_hasher() {
  init_tracing();
  let cache = CacheBuilder::<u64, &str, _>::with_hasher(
    "custom_hasher",
    std::collections::hash_map::RandomState::new(),
  )
  .build()
  .unwrap();

  cache.set(1, "one", NO_EXPIRE);
  assert_eq!(cache.get(&1).as_deref(), Some(&"one"));
}

#[tokio::test]
async fn test_debug_output_names_the_cache() {
  init_tracing();
  let cache: Cache<String, u32> = Cache::new("debuggable");
  let rendered = format!("{:?}", cache);
  assert!(rendered.contains("debuggable"));
}
