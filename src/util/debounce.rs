//! Trailing-edge debounce for async actions.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Coalesces rapid calls into one execution after a quiet interval.
///
/// Every [`call`](Self::call) supersedes the previous pending one. Only a
/// task whose timer elapses without being superseded runs; a task that has
/// already started is never interrupted.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` to run after the quiet interval.
    ///
    /// The returned handle resolves to `true` if the task ran and `false` if
    /// a newer call (or [`cancel`](Self::cancel)) superseded it.
    pub fn call<F>(&self, task: F) -> JoinHandle<bool>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            task.await;
            true
        })
    }

    /// Drop any pending call.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn only_the_last_call_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for value in 1..=4 {
            let seen = seen.clone();
            handles.push(debouncer.call(async move {
                seen.lock().unwrap().push(value);
            }));
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        let mut ran = Vec::new();
        for handle in handles {
            ran.push(handle.await.unwrap());
        }
        assert_eq!(ran, vec![false, false, false, true]);
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_outside_the_window_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(150));
        let first = debouncer.call(async {});
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(first.await.unwrap());

        let second = debouncer.call(async {});
        assert!(second.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_secs(5));
        let pending = debouncer.call(async {});
        debouncer.cancel();
        assert!(!pending.await.unwrap());
    }
}
