use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// A reader-writer lock built on a blocking `parking_lot::RwLock` that also
/// offers a non-thread-blocking `async` path for writers.
///
/// Facade calls take the lock synchronously; background tasks running on the
/// runtime acquire the write side through [`HybridRwLock::write_async`] so a
/// contended table never parks a runtime worker thread.
#[derive(Debug, Default)]
pub(crate) struct HybridRwLock<T> {
  inner: RwLock<T>,
  writer_waiters: Mutex<VecDeque<Waker>>,
}

impl<T> HybridRwLock<T> {
  pub(crate) fn new(data: T) -> Self {
    Self {
      inner: RwLock::new(data),
      writer_waiters: Mutex::new(VecDeque::new()),
    }
  }

  /// Acquires a shared read lock, blocking the current thread.
  pub(crate) fn read(&self) -> HybridReadGuard<'_, T> {
    HybridReadGuard {
      guard: self.inner.read(),
      _wake: WakeWriters(&self.writer_waiters),
    }
  }

  /// Acquires an exclusive write lock, blocking the current thread.
  pub(crate) fn write(&self) -> HybridWriteGuard<'_, T> {
    HybridWriteGuard {
      guard: self.inner.write(),
      _wake: WakeWriters(&self.writer_waiters),
    }
  }

  /// Acquires an exclusive write lock asynchronously.
  ///
  /// Under contention the returned future parks the task, not the thread.
  pub(crate) fn write_async(&self) -> WriteFuture<'_, T> {
    WriteFuture { lock: self }
  }
}

/// Wakes every parked async writer when dropped.
///
/// It is always the last field of a guard so it runs after the inner lock
/// guard has been released. All waiters are woken, not just the first: a
/// queued waker may belong to a future that was dropped (an aborted task),
/// and waking only that one would strand the writers behind it. Writers that
/// lose the race for the lock queue up again.
#[derive(Debug)]
struct WakeWriters<'a>(&'a Mutex<VecDeque<Waker>>);

impl Drop for WakeWriters<'_> {
  fn drop(&mut self) {
    let parked = std::mem::take(&mut *self.0.lock());
    for waker in parked {
      waker.wake();
    }
  }
}

#[derive(Debug)]
pub(crate) struct HybridReadGuard<'a, T> {
  guard: RwLockReadGuard<'a, T>,
  _wake: WakeWriters<'a>,
}

impl<T> Deref for HybridReadGuard<'_, T> {
  type Target = T;
  fn deref(&self) -> &Self::Target {
    &self.guard
  }
}

#[derive(Debug)]
pub(crate) struct HybridWriteGuard<'a, T> {
  guard: RwLockWriteGuard<'a, T>,
  _wake: WakeWriters<'a>,
}

impl<T> Deref for HybridWriteGuard<'_, T> {
  type Target = T;
  fn deref(&self) -> &Self::Target {
    &self.guard
  }
}

impl<T> DerefMut for HybridWriteGuard<'_, T> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.guard
  }
}

/// The `Future` returned by [`HybridRwLock::write_async`].
#[must_use = "futures do nothing unless you .await or poll them"]
pub(crate) struct WriteFuture<'a, T> {
  lock: &'a HybridRwLock<T>,
}

impl<'a, T> Future for WriteFuture<'a, T> {
  type Output = HybridWriteGuard<'a, T>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let lock = self.lock;
    if let Some(guard) = lock.inner.try_write() {
      return Poll::Ready(HybridWriteGuard {
        guard,
        _wake: WakeWriters(&lock.writer_waiters),
      });
    }

    let mut waiters = lock.writer_waiters.lock();

    // A guard may have been released between the first attempt and taking
    // the waiters lock; its wake-up would have found an empty queue.
    if let Some(guard) = lock.inner.try_write() {
      drop(waiters);
      return Poll::Ready(HybridWriteGuard {
        guard,
        _wake: WakeWriters(&lock.writer_waiters),
      });
    }

    if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
      waiters.push_back(cx.waker().clone());
    }

    Poll::Pending
  }
}
