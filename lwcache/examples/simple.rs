use lwcache::Cache;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt().with_env_filter("lwcache=debug").init();

  let cache: Cache<u32, &str> = Cache::new("sample");
  let start = Instant::now();

  cache.set(1, "Apple", Duration::from_secs(1));
  cache.set(2, "Banana", Duration::from_secs(2));
  cache.set(3, "Cake", Duration::from_secs(3));
  cache.set_expire(&1, Duration::from_secs(5));

  for _ in 0..4 {
    for key in 1..=3 {
      let value = cache.get(&key);
      println!(
        "t={:>2}s  key {}: {:?}",
        start.elapsed().as_secs(),
        key,
        value.as_deref()
      );
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
  }

  println!("{:#?}", cache.metrics());
}
