//! Bounded concurrency queue for work against the external service.
//!
//! Pending items are admitted in FIFO order while fewer than `max_concurrent`
//! are running. Every admitted item holds a slot guard; dropping the guard
//! (on success, failure, or panic) releases the slot and admits the next item
//! inside the same critical section, so the queue can never stall while work
//! keeps settling.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::TabId;
use crate::core::config::MAX_CONCURRENT;
use crate::errors::SummaryError;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct WorkItem {
    tab_id: TabId,
    job: Job,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<WorkItem>,
    in_flight: usize,
}

struct Inner {
    state: Mutex<QueueState>,
    max_concurrent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub max_concurrent: usize,
}

/// Cloneable handle to one shared queue.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_CONCURRENT)
    }

    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                max_concurrent: max_concurrent.max(1),
            }),
        }
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            pending: state.pending.len(),
            in_flight: state.in_flight,
            max_concurrent: self.inner.max_concurrent,
        }
    }

    /// Queue `work` for `tab_id` and admit it immediately if there is capacity.
    ///
    /// The returned future settles exactly when `work` does. Dropping it does not
    /// cancel the work; the slot is still released when the work settles. The same
    /// tab may be queued more than once; de-duplication happens upstream via the cache.
    pub fn enqueue<T, F, Fut>(&self, tab_id: TabId, work: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SummaryError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let result = work().await;
                if tx.send(result).is_err() {
                    debug!("[Queue] Caller for tab {} stopped listening", tab_id);
                }
            }
            .boxed()
        });

        let admitted = {
            let mut state = self.lock();
            state.pending.push_back(WorkItem { tab_id, job });
            info!(
                "[Queue] Added tab {} to queue, total queued: {}",
                tab_id,
                state.pending.len()
            );
            self.admit(&mut state)
        };
        self.start(admitted);

        Pending { rx }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Work never runs under the lock, so a poisoned state is still consistent
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Pops as many pending items as capacity allows. Caller holds the lock.
    fn admit(&self, state: &mut QueueState) -> Vec<WorkItem> {
        let mut admitted = Vec::new();
        while state.in_flight < self.inner.max_concurrent {
            let Some(item) = state.pending.pop_front() else {
                break;
            };
            state.in_flight += 1;
            info!(
                "[Queue] Processing tab {}, active={}, remaining={}",
                item.tab_id,
                state.in_flight,
                state.pending.len()
            );
            admitted.push(item);
        }
        admitted
    }

    fn start(&self, items: Vec<WorkItem>) {
        if items.is_empty() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(
                "[Queue] No async runtime available, abandoning {} admitted items",
                items.len()
            );
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(items.len());
            return;
        };

        for item in items {
            let slot = SlotGuard {
                queue: self.clone(),
                tab_id: item.tab_id,
            };
            handle.spawn(async move {
                let _slot = slot;
                (item.job)().await;
            });
        }
    }

    /// Decrement and re-admit without any suspension point in between.
    fn release(&self, tab_id: TabId) {
        let admitted = {
            let mut state = self.lock();
            debug_assert!(state.in_flight > 0, "in-flight counter underflow");
            state.in_flight = state.in_flight.saturating_sub(1);
            info!(
                "[Queue] Completed tab {}, active={}, remaining={}",
                tab_id,
                state.in_flight,
                state.pending.len()
            );
            self.admit(&mut state)
        };
        self.start(admitted);
    }
}

struct SlotGuard {
    queue: RequestQueue,
    tab_id: TabId,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.queue.release(self.tab_id);
    }
}

/// Completion of one queued work item.
#[must_use = "dropping the handle discards the result but does not cancel the work"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, SummaryError>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T, SummaryError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without a value: the work panicked or was discarded
            Poll::Ready(Err(_)) => Poll::Ready(Err(SummaryError::WorkAbandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}
