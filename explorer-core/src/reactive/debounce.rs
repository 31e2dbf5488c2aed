//! Trailing-edge debounce on the tokio timer.
//!
//! Each call replaces the pending one: only the last closure handed to
//! [`Debouncer::call`] within a quiet window runs. A zero window runs the
//! closure synchronously.
//!
//! Timers run on the runtime of the calling thread, falling back to the
//! runtime the debouncer was created on. With neither available the closure
//! runs synchronously: input handlers are plain functions and may be driven
//! from a thread that has no runtime.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct Debouncer {
    window: Duration,
    runtime: Option<Handle>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            runtime: Handle::try_current().ok(),
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `f` to run once the window elapses without another call.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.window.is_zero() {
            self.cancel();
            f();
            return;
        }

        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            warn!(window = ?self.window, "no tokio runtime for debounced call, running it now");
            self.cancel();
            f();
            return;
        };

        let window = self.window;
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            f();
        }));
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn only_last_call_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let value = Arc::new(AtomicI32::new(0));

        for i in 1..=5 {
            let value_clone = value.clone();
            debouncer.call(move || value_clone.store(i, Ordering::SeqCst));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        // 50ms after the last call: still pending
        assert_eq!(value.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(value.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let value = Arc::new(AtomicI32::new(0));
        let value_clone = value.clone();

        debouncer.call(move || value_clone.store(1, Ordering::SeqCst));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(value.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_window_runs_immediately() {
        // No runtime needed.
        let debouncer = Debouncer::new(Duration::ZERO);
        let value = Arc::new(AtomicI32::new(0));
        let value_clone = value.clone();

        debouncer.call(move || value_clone.store(7, Ordering::SeqCst));
        assert_eq!(value.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn without_runtime_calls_run_immediately() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let value = Arc::new(AtomicI32::new(0));

        for i in 1..=3 {
            let value_clone = value.clone();
            debouncer.call(move || value_clone.store(i, Ordering::SeqCst));
            assert_eq!(value.load(Ordering::SeqCst), i);
        }
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn falls_back_to_the_creating_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let debouncer = runtime.block_on(async { Debouncer::new(Duration::from_millis(20)) });
        let value = Arc::new(AtomicI32::new(0));
        let value_clone = value.clone();

        // Called from a thread outside the runtime.
        debouncer.call(move || value_clone.store(9, Ordering::SeqCst));
        assert_eq!(value.load(Ordering::SeqCst), 0);

        runtime.block_on(async { tokio::time::sleep(Duration::from_millis(50)).await });
        assert_eq!(value.load(Ordering::SeqCst), 9);
    }
}
