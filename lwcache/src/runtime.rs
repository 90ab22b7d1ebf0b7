//! The runtime that caches created outside of Tokio run their timers and
//! refresh loops on.

use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};

static BACKGROUND: OnceCell<Runtime> = OnceCell::new();

const BACKGROUND_WORKERS: usize = 2;

/// Returns the handle of the runtime this is called from, or, outside of any
/// runtime, of a small multi-threaded runtime shared by all such caches. That
/// runtime is started on first use and lives for the rest of the process.
pub(crate) fn current_or_background() -> std::io::Result<Handle> {
  if let Ok(handle) = Handle::try_current() {
    return Ok(handle);
  }

  let runtime = BACKGROUND.get_or_try_init(|| {
    tracing::debug!(workers = BACKGROUND_WORKERS, "starting background runtime");
    Builder::new_multi_thread()
      .worker_threads(BACKGROUND_WORKERS)
      .thread_name("lwcache-worker")
      .enable_time()
      .build()
  })?;
  Ok(runtime.handle().clone())
}
