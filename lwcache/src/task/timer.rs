use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one armed timer. Ids are never reused within a process, so a
/// firing timer can tell whether the entry it was armed for still owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TimerId(u64);

/// What a fired timer found when it went to remove its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FireOutcome {
  /// The entry was removed. The timer is done.
  Removed,
  /// The deadline was moved into the future while the timer was waiting for
  /// the table lock. The timer goes back to sleep.
  Rescheduled,
  /// The entry is gone or belongs to a different timer. The timer is done.
  Stale,
}

/// The scheduled deletion task of a single cache entry.
///
/// The task sleeps until the deadline published on its watch channel and then
/// invokes the fire callback. Resetting the deadline sends a new value and
/// wakes the task in place; dropping the `ExpirationTimer` aborts the task.
#[derive(Debug)]
pub(crate) struct ExpirationTimer {
  id: TimerId,
  deadline: watch::Sender<Instant>,
  task: JoinHandle<()>,
}

impl ExpirationTimer {
  /// Spawns a timer task on `runtime` that fires at `deadline`.
  pub(crate) fn arm<F, Fut>(runtime: &Handle, deadline: Instant, on_fire: F) -> Self
  where
    F: Fn(TimerId) -> Fut + Send + 'static,
    Fut: Future<Output = FireOutcome> + Send + 'static,
  {
    let id = TimerId(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed));
    let (deadline_tx, deadline_rx) = watch::channel(deadline);
    let task = runtime.spawn(run_timer(id, deadline_rx, on_fire));

    Self {
      id,
      deadline: deadline_tx,
      task,
    }
  }

  #[inline]
  pub(crate) fn id(&self) -> TimerId {
    self.id
  }

  /// The deadline the timer is currently sleeping towards.
  #[inline]
  pub(crate) fn deadline(&self) -> Instant {
    *self.deadline.borrow()
  }

  /// Moves the deadline without spawning a new task.
  pub(crate) fn reset(&self, deadline: Instant) {
    self.deadline.send_replace(deadline);
  }
}

impl Drop for ExpirationTimer {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn run_timer<F, Fut>(id: TimerId, mut deadline_rx: watch::Receiver<Instant>, on_fire: F)
where
  F: Fn(TimerId) -> Fut,
  Fut: Future<Output = FireOutcome>,
{
  loop {
    let deadline = *deadline_rx.borrow_and_update();

    tokio::select! {
      _ = tokio::time::sleep_until(deadline.into()) => {
        match on_fire(id).await {
          FireOutcome::Rescheduled => continue,
          FireOutcome::Removed | FireOutcome::Stale => return,
        }
      }
      changed = deadline_rx.changed() => {
        // The sender lives in the `ExpirationTimer`; losing it means the
        // owning entry is gone even if the abort has not landed yet.
        if changed.is_err() {
          return;
        }
      }
    }
  }
}
