use crate::generator::PathGenerator;
use keyhole_core::{Record, Result, Store, StoreError, User};
use std::sync::Arc;

/// URL-creation service: picks shortened paths and writes records
/// through the `Store` contract.
#[derive(Debug)]
pub struct UrlService<S, G> {
    store: Arc<S>,
    generator: G,
    path_len: usize,
}

impl<S: Store, G: PathGenerator> UrlService<S, G> {
    /// `path_len` is the number of random bytes fed to the generator
    /// per path.
    pub fn new(store: Arc<S>, generator: G, path_len: usize) -> Self {
        Self {
            store,
            generator,
            path_len,
        }
    }

    /// Shortens `original_url` for `user`.
    ///
    /// If the URL is already stored the result is `NotUnique` carrying
    /// the existing record, so callers can answer with the existing
    /// mapping instead of failing the request.
    pub async fn create(&self, original_url: impl Into<String>, user: User) -> Result<Record> {
        let original_url = original_url.into();

        match self.store.find_by_original_url(&original_url).await {
            Ok(existing) => Err(StoreError::NotUnique { existing }),
            Err(StoreError::NotFound) => {
                let record = Record {
                    original_url,
                    shortened_path: self.generator.generate(self.path_len),
                    user_id: user.id,
                    ..Record::default()
                };
                self.store.insert(record.clone()).await?;
                Ok(record)
            }
            Err(err) => Err(err),
        }
    }

    /// Shortens every record for `user` in one call, preserving each
    /// caller-supplied `correlation_id` for request/response pairing.
    /// Re-submitting a URL overwrites its existing mapping
    /// (upsert-by-URL), so batch ingestion is re-applicable.
    pub async fn batch_create(&self, mut records: Vec<Record>, user: User) -> Result<Vec<Record>> {
        for record in &mut records {
            record.shortened_path = self.generator.generate(self.path_len);
            record.user_id = user.id;
        }

        self.store.batch_upsert(records.clone()).await?;
        Ok(records)
    }
}
