use crate::models::FormStateKey;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delays commits per form field; a newer commit for the same field replaces
/// the pending one.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<HashMap<FormStateKey, JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn schedule<F>(&self, key: FormStateKey, commit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, task| !task.is_finished());

        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            commit.await;
        });
        if let Some(previous) = pending.insert(key, handle) {
            debug!("superseding pending commit for {key}");
            previous.abort();
        }
    }

    /// Aborts the pending commit for `key`, if any. Returns whether one was
    /// still waiting to run.
    pub async fn cancel(&self, key: FormStateKey) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.remove(&key) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!("cancelled pending commit for {key}");
                true
            }
            _ => false,
        }
    }

    /// Aborts every pending commit.
    pub async fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let mut cancelled = 0;
        for (_, handle) in pending.drain() {
            if !handle.is_finished() {
                handle.abort();
                cancelled += 1;
            }
        }
        cancelled
    }
}
