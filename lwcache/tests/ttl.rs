mod common;

use common::{build_test_cache, key};
use lwcache::{Ttl, NO_EXPIRE};
use std::time::Duration;
use tokio::time::sleep;

const TINY_TTL: Duration = Duration::from_millis(150);
const SLEEP_MARGIN: Duration = Duration::from_millis(150);

#[tokio::test(flavor = "multi_thread")]
async fn test_item_expires_after_ttl() {
  let cache = build_test_cache::<&str>("ttl_basic");

  cache.set(key("key"), "value", TINY_TTL);
  assert_eq!(cache.get("key").as_deref(), Some(&"value"));

  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert!(cache.get("key").is_none(), "Item should have expired");
  assert_eq!(cache.len(), 0, "Timer should have removed the entry");

  let metrics = cache.metrics();
  assert_eq!(metrics.hits, 1);
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.expirations, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_expire_entry_stays() {
  let cache = build_test_cache::<u32>("ttl_no_expire");

  cache.set(key("forever"), 1, NO_EXPIRE);
  cache.set(key("also_forever"), 2, Ttl::from(None));
  sleep(Duration::from_millis(300)).await;

  assert_eq!(cache.get("forever").as_deref(), Some(&1));
  assert_eq!(cache.get("also_forever").as_deref(), Some(&2));
  assert_eq!(cache.metrics().expirations, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zero_ttl_expires_immediately() {
  let cache = build_test_cache::<u32>("ttl_zero");

  cache.set(key("k"), 1, Duration::ZERO);
  assert!(cache.get("k").is_none(), "A zero TTL is already past its deadline");

  sleep(Duration::from_millis(50)).await;
  assert!(cache.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_expire_postpones_removal() {
  let cache = build_test_cache::<u32>("ttl_extend");

  cache.set(key("k"), 7, Duration::from_millis(200));
  sleep(Duration::from_millis(100)).await;
  assert!(cache.set_expire(&key("k"), Duration::from_millis(400)));

  // Past the first deadline, well before the new one.
  sleep(Duration::from_millis(200)).await;
  assert_eq!(cache.get("k").as_deref(), Some(&7));

  sleep(Duration::from_millis(350)).await;
  assert!(cache.get("k").is_none());
  assert_eq!(cache.metrics().expirations, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_expire_shortens_deadline() {
  let cache = build_test_cache::<u32>("ttl_shorten");

  cache.set(key("k"), 1, Duration::from_secs(60));
  assert!(cache.set_expire("k", TINY_TTL), "Borrowed keys work like in get/del");

  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert!(cache.get("k").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_expire_on_absent_key_is_a_no_op() {
  let cache = build_test_cache::<u32>("ttl_absent");

  assert!(!cache.set_expire(&key("ghost"), Duration::from_secs(1)));
  assert!(cache.get("ghost").is_none());
  assert_eq!(cache.len(), 0);
  assert_eq!(cache.metrics().deadline_updates, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_expire_no_expire_cancels_removal() {
  let cache = build_test_cache::<u32>("ttl_to_permanent");

  cache.set(key("k"), 1, TINY_TTL);
  assert!(cache.set_expire(&key("k"), NO_EXPIRE));

  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert_eq!(cache.get("k").as_deref(), Some(&1));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_expire_gives_permanent_entry_a_deadline() {
  let cache = build_test_cache::<u32>("ttl_from_permanent");

  cache.set(key("k"), 1, NO_EXPIRE);
  // The new timer is armed for the stored key, not the borrowed one.
  assert!(cache.set_expire("k", TINY_TTL));
  assert_eq!(cache.get("k").as_deref(), Some(&1));

  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert!(cache.get("k").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_replacing_an_entry_cancels_its_old_timer() {
  let cache = build_test_cache::<&str>("ttl_replace");

  cache.set(key("k"), "old", TINY_TTL);
  cache.set(key("k"), "new", NO_EXPIRE);

  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert_eq!(cache.get("k").as_deref(), Some(&"new"));
  assert_eq!(cache.metrics().expirations, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_replacing_an_entry_restarts_its_ttl() {
  let cache = build_test_cache::<&str>("ttl_restart");

  cache.set(key("k"), "v1", Duration::from_millis(200));
  sleep(Duration::from_millis(100)).await;
  cache.set(key("k"), "v2", Duration::from_millis(300));

  sleep(Duration::from_millis(200)).await;
  assert_eq!(cache.get("k").as_deref(), Some(&"v2"));

  sleep(Duration::from_millis(250)).await;
  assert!(cache.get("k").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_cancels_pending_expiration() {
  let cache = build_test_cache::<u32>("ttl_delete");

  cache.set(key("k"), 1, TINY_TTL);
  assert!(cache.del("k"));

  // Re-inserted without a TTL: the old timer must not take it out.
  cache.set(key("k"), 2, NO_EXPIRE);
  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert_eq!(cache.get("k").as_deref(), Some(&2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_many_entries_expire_independently() {
  let cache = build_test_cache::<usize>("ttl_many");

  for i in 0..50 {
    let ttl = if i % 2 == 0 { TINY_TTL } else { Duration::from_secs(60) };
    cache.set(format!("key{}", i), i, ttl);
  }
  assert_eq!(cache.len(), 50);

  sleep(TINY_TTL + SLEEP_MARGIN).await;
  assert_eq!(cache.len(), 25);
  for i in 0..50 {
    assert_eq!(cache.get(format!("key{}", i).as_str()).is_some(), i % 2 == 1);
  }
}
