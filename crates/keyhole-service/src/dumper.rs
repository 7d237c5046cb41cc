use keyhole_storage::{FileStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Periodically mirrors a `MemoryStore` into its backing file.
///
/// Dump failures are logged and the loop keeps going; durability
/// writes failing must never take down in-memory serving. The final
/// at-exit dump stays the caller's lifecycle responsibility.
#[derive(Debug)]
pub struct StorageDumper {
    store: Arc<MemoryStore>,
    file: FileStore,
    interval: Duration,
}

impl StorageDumper {
    pub fn new(store: Arc<MemoryStore>, file: FileStore, interval: Duration) -> Self {
        Self {
            store,
            file,
            interval,
        }
    }

    /// Runs the dump loop forever. Intended to be spawned once at
    /// startup; the first dump happens immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(err) = self.file.dump(&self.store).await {
                warn!(%err, "storage dump failed");
            }
        }
    }
}
