//! Idle timeout tracking.
//!
//! # State
//! ```text
//! last_activity: refreshed when a request starts and when it ends
//! in_flight:     requests currently being served
//! fired:         set once the idle callback has run
//! ```
//!
//! The node is idle when nothing is in flight and `timeout` has passed since
//! `last_activity`. The callback runs at most once per tracker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::runtime::IdleCallback;

#[derive(Debug)]
struct Inner {
    timeout: Duration,
    last_activity: Mutex<Instant>,
    in_flight: AtomicUsize,
    fired: AtomicBool,
    became_idle: Notify,
}

/// Shared idle state of a server runtime.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    inner: Arc<Inner>,
}

impl IdleTracker {
    /// Start tracking now with the given idle timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                timeout,
                last_activity: Mutex::new(Instant::now()),
                in_flight: AtomicUsize::new(0),
                fired: AtomicBool::new(false),
                became_idle: Notify::new(),
            }),
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        let mut last = self.inner.last_activity.lock().unwrap_or_else(|e| e.into_inner());
        *last = Instant::now();
    }

    /// Mark a request as in flight until the returned guard is dropped.
    pub fn request_started(&self) -> ActivityGuard {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        self.touch();
        ActivityGuard {
            tracker: self.clone(),
        }
    }

    /// Requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Whether the idle callback has already run.
    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    fn last_activity(&self) -> Instant {
        *self.inner.last_activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_finished(&self) {
        self.touch();
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.became_idle.notify_one();
        }
    }

    /// Run the callback once if it has not run yet. Returns whether it ran.
    fn fire(&self, on_idle: &IdleCallback) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::info!(
            timeout_secs = self.inner.timeout.as_secs_f64(),
            "Idle timeout reached"
        );
        on_idle();
        true
    }

    /// Watch for inactivity until the callback fires or `cancel` is cancelled.
    pub async fn watch(&self, on_idle: IdleCallback, cancel: CancellationToken) {
        tracing::debug!(timeout = ?self.inner.timeout, "Idle watcher started");

        loop {
            if self.has_fired() {
                return;
            }
            if self.in_flight() > 0 {
                let became_idle = self.inner.became_idle.notified();
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = became_idle => continue,
                }
            }

            let deadline = self.last_activity() + self.inner.timeout;
            if Instant::now() >= deadline {
                self.fire(&on_idle);
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }
}

/// Keeps a request counted as in flight while alive.
#[derive(Debug)]
pub struct ActivityGuard {
    tracker: IdleTracker,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.tracker.request_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_callback() -> (IdleCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let cb: IdleCallback = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (cb, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_exactly_once_after_timeout() {
        let tracker = IdleTracker::new(Duration::from_secs(5));
        let (cb, count) = counting_callback();
        let watcher = tracker.clone();
        let handle = tokio::spawn(async move { watcher.watch(cb, CancellationToken::new()).await });

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(tracker.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_postpones_timeout() {
        let tracker = IdleTracker::new(Duration::from_secs(5));
        let (cb, count) = counting_callback();
        let watcher = tracker.clone();
        tokio::spawn(async move { watcher.watch(cb, CancellationToken::new()).await });

        tokio::time::sleep(Duration::from_secs(3)).await;
        tracker.touch();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_request_keeps_node_busy() {
        let tracker = IdleTracker::new(Duration::from_secs(5));
        let (cb, count) = counting_callback();
        let watcher = tracker.clone();
        tokio::spawn(async move { watcher.watch(cb, CancellationToken::new()).await });

        let guard = tracker.request_started();
        assert_eq!(tracker.in_flight(), 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        drop(guard);
        assert_eq!(tracker.in_flight(), 0);
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_watcher_without_firing() {
        let tracker = IdleTracker::new(Duration::from_secs(5));
        let (cb, count) = counting_callback();
        let cancel = CancellationToken::new();
        let watcher = tracker.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { watcher.watch(cb, token).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!tracker.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_watchers_fire_once() {
        let tracker = IdleTracker::new(Duration::from_secs(1));
        let (cb, count) = counting_callback();
        let a = tracker.clone();
        let b = tracker.clone();
        let cb_b = cb.clone();
        tokio::spawn(async move { a.watch(cb, CancellationToken::new()).await });
        tokio::spawn(async move { b.watch(cb_b, CancellationToken::new()).await });

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
