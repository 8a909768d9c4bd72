//! De-duplication of concurrent identical requests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

/// Runs at most one in-flight future per key; concurrent callers with the
/// same key await the same result.
pub struct SingleFlight<T: Clone> {
    inflight: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("SingleFlight")
            .field("inflight", &inflight)
            .finish()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight call for `key`, or start one with `start`.
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut inflight = self.lock();
            match inflight.get(key) {
                Some(existing) => {
                    tracing::debug!(key, "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    let shared = start().boxed().shared();
                    inflight.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        let mut inflight = self.lock();
        if inflight
            .get(key)
            .is_some_and(|current| current.ptr_eq(&shared))
        {
            inflight.remove(key);
        }
        result
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Shared<BoxFuture<'static, T>>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
