use crate::memory::MemoryStore;
use keyhole_core::{Record, Result, StoreError};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-backed mirror of a `MemoryStore`, used only for restart
/// recovery. The format is one JSON object per line, which keeps dumps
/// human-diffable and lets a corrupt tail be skipped line by line.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the backing file, deserializing each line independently.
    /// Malformed lines are counted and skipped, never fatal; a missing
    /// file is an empty snapshot.
    pub async fn snapshot(&self) -> Result<Vec<Record>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StoreError::Persistence(format!(
                    "could not read {}: {err}",
                    self.path.display()
                )))
            }
        };

        let mut records = Vec::new();
        let mut skipped = 0u64;
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(line) {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, path = %self.path.display(), "skipped malformed snapshot lines");
        }

        Ok(records)
    }

    /// Feeds every successfully parsed record into `store`, which
    /// recomputes its user counter from the loaded records.
    pub async fn restore(&self, store: &MemoryStore) -> Result<()> {
        let records = self.snapshot().await?;
        store.restore(records).await;
        Ok(())
    }

    /// Truncates the file and rewrites it from the store's current
    /// contents, one record per line. A full rewrite, not an append;
    /// the store's own lock serializes the enumeration against writers.
    pub async fn dump(&self, store: &MemoryStore) -> Result<()> {
        let records = store.records().await;

        let mut buf = String::new();
        for record in &records {
            let line = serde_json::to_string(record)
                .map_err(|err| StoreError::Persistence(format!("could not encode record: {err}")))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = tokio::fs::File::create(&self.path).await.map_err(|err| {
            StoreError::Persistence(format!("could not open {}: {err}", self.path.display()))
        })?;
        file.write_all(buf.as_bytes()).await.map_err(|err| {
            StoreError::Persistence(format!("could not dump storage: {err}"))
        })?;
        file.flush().await.map_err(|err| {
            StoreError::Persistence(format!("could not dump storage: {err}"))
        })?;

        Ok(())
    }
}
