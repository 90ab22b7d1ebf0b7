//! A lightweight, concurrent key/value cache with per-entry expiration and
//! periodic background refresh.
//!
//! # Features
//! - **Per-entry TTL**: every entry carries its own time-to-live, enforced by
//!   its own timer task. Deadlines can be moved or cleared after insertion.
//! - **Background refresh**: a single cache-wide refresher recomputes the
//!   values of the keys it is started for, each on its own interval.
//! - **Reentrant callbacks**: refreshers may call back into the cache (for
//!   example to extend the TTL of the key being refreshed).
//! - **Non-Clone Support**: Stores values in an `Arc<V>`, avoiding `V: Clone` bounds.
//! - **Observability**: `tracing` events and a metrics snapshot.
//!
//! Timers and refresh loops run on Tokio: the runtime the cache is created
//! on, or a shared background runtime when it is created outside of one.
//!
//! ```rust,no_run
//! use lwcache::Cache;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!   let cache: Cache<&'static str, u64> = Cache::new("ticks");
//!   cache.set("ticks", 0, Duration::from_secs(10));
//!   cache.set_refresher(|_key, ticks| Ok(ticks + 1));
//!   cache.start_refresher("ticks", Duration::from_secs(1));
//!
//!   tokio::time::sleep(Duration::from_millis(2500)).await;
//!   assert_eq!(cache.get("ticks").as_deref(), Some(&2));
//! }
//! ```

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod handles;
pub mod metrics;

// Internal, crate-only modules
mod entry;
mod refresher;
mod runtime;
mod shared;
mod store;
mod sync;
mod task;
mod time;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use error::{BoxError, BuildError};
pub use handles::{Cache, Getter};
pub use metrics::MetricsSnapshot;
pub use time::{Ttl, NO_EXPIRE};
