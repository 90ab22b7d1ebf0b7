use lwcache::Cache;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt().with_env_filter("lwcache=trace").init();

  let start = Instant::now();
  let cache: Cache<&'static str, u64> = Cache::new("refresh sample");
  cache.set("uptime", 0, Duration::from_secs(5));

  // A slow recomputation that keeps its own entry alive.
  cache.set_refresher_with_cache(move |cache, key, _current| {
    std::thread::sleep(Duration::from_secs(3));
    cache.set_expire(key, Duration::from_secs(5));
    Ok(start.elapsed().as_secs())
  });
  cache.start_refresher("uptime", Duration::from_secs(1));

  for _ in 0..10 {
    println!(
      "t={:>2}s  uptime = {:?}",
      start.elapsed().as_secs(),
      cache.get("uptime").as_deref()
    );
    tokio::time::sleep(Duration::from_secs(1)).await;
  }

  cache.stop_refresher("uptime");
}
