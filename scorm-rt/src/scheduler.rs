//! Commit scheduler
//!
//! Owns the pending update set and a single cancellable debounce timer.
//! Rapid `SetValue` calls coalesce into one request carrying the union of
//! their deltas, last value wins per key. A failed send puts its entries
//! back unless a newer value for the same key arrived in the meantime.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::BridgeResult;
use crate::transport::RuntimeTransport;

/// Debounced, batched writer for one lesson
#[derive(Clone)]
pub struct CommitScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    lesson_id: String,
    transport: Arc<dyn RuntimeTransport>,
    debounce: Duration,
    pending: Mutex<BTreeMap<String, String>>,
    timer: Mutex<Option<CancellationToken>>,
    /// Serializes sends so batches reach the server in drain order
    send_lock: tokio::sync::Mutex<()>,
}

impl CommitScheduler {
    pub fn new(lesson_id: impl Into<String>, transport: Arc<dyn RuntimeTransport>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                lesson_id: lesson_id.into(),
                transport,
                debounce,
                pending: Mutex::new(BTreeMap::new()),
                timer: Mutex::new(None),
                send_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Record the latest value for `path`
    pub fn enqueue(&self, path: &str, value: &str) {
        self.lock_pending().insert(path.to_string(), value.to_string());
    }

    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    /// Copy of the uncommitted updates
    pub fn pending(&self) -> BTreeMap<String, String> {
        self.lock_pending().clone()
    }

    /// (Re)start the debounce timer
    ///
    /// Only one timer is alive at a time; restarting cancels the previous
    /// one. Outside a tokio runtime nothing is scheduled and the updates
    /// wait for the next explicit flush.
    pub fn schedule_flush(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(lesson_id = %self.inner.lesson_id, "No async runtime, debounced commit not scheduled");
            return;
        };

        let token = CancellationToken::new();
        if let Some(previous) = self.lock_timer().replace(token.clone()) {
            previous.cancel();
        }

        let scheduler = self.clone();
        let debounce = self.inner.debounce;
        handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    // Failure is logged and re-queued inside
                    let _ = scheduler.send_pending().await;
                }
            }
        });
    }

    /// Cancel the timer and send everything pending now
    ///
    /// Returns the number of updates delivered.
    pub async fn flush_now(&self) -> BridgeResult<usize> {
        self.cancel_timer();
        self.send_pending().await
    }

    /// Hand everything pending to the transport's beacon
    ///
    /// Returns the number of updates handed off. Delivery is not confirmed.
    pub fn beacon_pending(&self) -> usize {
        self.cancel_timer();
        let batch = std::mem::take(&mut *self.lock_pending());
        let count = batch.len();
        if count > 0 {
            debug!(lesson_id = %self.inner.lesson_id, updates = count, "Sending unload beacon");
            self.inner.transport.beacon(&self.inner.lesson_id, batch);
        }
        count
    }

    /// Drop the debounce timer without sending
    pub fn cancel_timer(&self) {
        if let Some(token) = self.lock_timer().take() {
            token.cancel();
        }
    }

    async fn send_pending(&self) -> BridgeResult<usize> {
        let _send_guard = self.inner.send_lock.lock().await;

        let batch = std::mem::take(&mut *self.lock_pending());
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        match self.inner.transport.commit(&self.inner.lesson_id, &batch).await {
            Ok(()) => {
                debug!(lesson_id = %self.inner.lesson_id, updates = count, "Commit succeeded");
                Ok(count)
            }
            Err(e) => {
                self.requeue(batch);
                warn!(
                    lesson_id = %self.inner.lesson_id,
                    updates = count,
                    error = %e,
                    "Commit failed, updates re-queued"
                );
                Err(e)
            }
        }
    }

    fn requeue(&self, batch: BTreeMap<String, String>) {
        let mut pending = self.lock_pending();
        for (path, value) in batch {
            // A value written while the request was in flight is newer
            pending.entry(path).or_insert(value);
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
