use keyhole_core::{Record, Result, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, warn};

/// Default bound on the inbound delete queue.
pub const QUEUE_CAPACITY: usize = 1024;

/// Default interval between flushes of the pending batch.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Cloneable producer side of the delete queue.
///
/// Enqueueing never touches the store's lock; only the worker's
/// periodic flush does, bounding lock contention to once per interval.
#[derive(Debug, Clone)]
pub struct DeleteHandle {
    tx: mpsc::Sender<Record>,
}

impl DeleteHandle {
    /// Queues a record for deferred soft deletion.
    ///
    /// Non-blocking under normal load; when the queue is full this
    /// awaits until space frees, so callers must not assume it is
    /// instantaneous under back-pressure. The deletion is applied on
    /// the worker's next flush, up to one interval later.
    pub async fn enqueue(&self, record: Record) -> Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| StoreError::Unavailable("delete worker has stopped".to_string()))
    }
}

/// Deferred batch-deletion worker.
///
/// Collects delete requests from a bounded queue and applies them to
/// the store in one `batch_soft_delete` call per interval, amortizing
/// bursty delete traffic into a single write per tick. A failed flush
/// drops its batch: deletion is at-most-once, best-effort.
#[derive(Debug)]
pub struct BatchDeleter<S> {
    store: Arc<S>,
    rx: mpsc::Receiver<Record>,
    flush_interval: Duration,
}

impl<S: Store> BatchDeleter<S> {
    /// Creates a worker with the default queue bound and flush interval.
    pub fn new(store: Arc<S>) -> (DeleteHandle, Self) {
        Self::with_config(store, QUEUE_CAPACITY, FLUSH_INTERVAL)
    }

    /// Creates a worker with an explicit queue bound and flush interval.
    pub fn with_config(
        store: Arc<S>,
        queue_capacity: usize,
        flush_interval: Duration,
    ) -> (DeleteHandle, Self) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        (
            DeleteHandle { tx },
            Self {
                store,
                rx,
                flush_interval,
            },
        )
    }

    /// Runs the delete loop. Intended to be spawned once at startup.
    ///
    /// Returns after every `DeleteHandle` has been dropped, flushing
    /// any still-pending batch first so an orderly shutdown does not
    /// lose queued deletes.
    pub async fn run(mut self) {
        // First tick one full interval out; requests enqueued now must
        // stay pending until then.
        let start = tokio::time::Instant::now() + self.flush_interval;
        let mut ticker = tokio::time::interval_at(start, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pending: Vec<Record> = Vec::new();

        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(record) => pending.push(record),
                    // All handles dropped: the queue is closed.
                    None => break,
                },
                _ = ticker.tick() => self.flush(&mut pending).await,
            }
        }

        self.flush(&mut pending).await;
    }

    async fn flush(&self, pending: &mut Vec<Record>) {
        if pending.is_empty() {
            return;
        }

        let batch = std::mem::take(pending);
        let batch_size = batch.len();
        match self.store.batch_soft_delete(batch).await {
            Ok(0) => {}
            Ok(skipped) => {
                warn!(skipped, batch_size, "batch delete skipped unmatched records");
            }
            Err(err) => {
                // Best-effort by design: the batch is dropped, not retried.
                error!(%err, batch_size, "batch delete failed, dropping batch");
            }
        }
    }
}
