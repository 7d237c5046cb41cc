use async_trait::async_trait;
use keyhole_core::{Record, Result, Store, StoreError, User};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::warn;

/// Indexed table state. Records live in an append-only vector and the
/// three indices store slot numbers into it, so content-changing
/// operations can mutate a slot in place and only re-point indices.
#[derive(Debug)]
struct Table {
    records: Vec<Record>,
    by_original_url: HashMap<String, usize>,
    by_shortened_path: HashMap<String, usize>,
    by_user: HashMap<i64, HashSet<usize>>,
    next_user_id: i64,
}

impl Table {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            by_original_url: HashMap::new(),
            by_shortened_path: HashMap::new(),
            by_user: HashMap::new(),
            next_user_id: 1,
        }
    }

    /// Appends `record` as a fresh slot and points all three indices
    /// at it. The caller must have verified the URL is unmapped.
    fn append(&mut self, record: Record) {
        let slot = self.records.len();
        self.by_original_url
            .insert(record.original_url.clone(), slot);
        self.by_shortened_path
            .insert(record.shortened_path.clone(), slot);
        self.by_user.entry(record.user_id).or_default().insert(slot);
        self.records.push(record);
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        if let Some(&slot) = self.by_original_url.get(&record.original_url) {
            return Err(StoreError::NotUnique {
                existing: self.records[slot].clone(),
            });
        }

        self.append(record);
        Ok(())
    }

    fn upsert(&mut self, record: Record) {
        match self.by_original_url.get(&record.original_url).copied() {
            Some(slot) => {
                // Tear down the old path and owner entries before the
                // slot content changes; a torn ordering here is what
                // leaves readers seeing a path index pointing at a
                // slot whose other indices have already moved.
                let old = &self.records[slot];
                self.by_shortened_path.remove(&old.shortened_path);
                if let Some(slots) = self.by_user.get_mut(&old.user_id) {
                    slots.remove(&slot);
                }

                self.by_shortened_path
                    .insert(record.shortened_path.clone(), slot);
                self.by_user.entry(record.user_id).or_default().insert(slot);
                self.records[slot] = record;
            }
            None => self.append(record),
        }
    }

    fn soft_delete(&mut self, record: &Record) -> bool {
        let Some(&slot) = self.by_shortened_path.get(&record.shortened_path) else {
            return false;
        };
        let owned = self
            .by_user
            .get(&record.user_id)
            .is_some_and(|slots| slots.contains(&slot));
        if !owned {
            return false;
        }

        self.records[slot].is_deleted = true;
        true
    }
}

/// In-memory store with O(1) lookup by original URL, shortened path,
/// and owning user.
///
/// All state sits behind a single read-write lock: the indices are not
/// independently lockable because every content-changing operation must
/// update several of them atomically relative to readers. Each batch
/// call is one critical section.
#[derive(Debug)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    /// Creates an empty store with its user counter at 1.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::new()),
        }
    }

    /// Enumerates all records, live and soft-deleted, for persistence.
    pub async fn records(&self) -> Vec<Record> {
        self.table.read().await.records.clone()
    }

    /// Bulk-loads previously persisted records through the same logic
    /// as `insert`, then recomputes the user counter as
    /// `max(seen user_id) + 1`. Records whose URL is already mapped
    /// are logged and skipped.
    pub async fn restore(&self, records: Vec<Record>) {
        let mut table = self.table.write().await;
        let mut max_user_id = 0;
        for record in records {
            if record.user_id > max_user_id {
                max_user_id = record.user_id;
            }
            if let Err(err) = table.insert(record) {
                warn!(%err, "failed to restore record");
            }
        }
        table.next_user_id = max_user_id + 1;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_by_original_url(&self, original_url: &str) -> Result<Record> {
        let table = self.table.read().await;
        let slot = table
            .by_original_url
            .get(original_url)
            .ok_or(StoreError::NotFound)?;
        Ok(table.records[*slot].clone())
    }

    async fn find_by_shortened_path(&self, shortened_path: &str) -> Result<Record> {
        let table = self.table.read().await;
        let slot = table
            .by_shortened_path
            .get(shortened_path)
            .ok_or(StoreError::NotFound)?;
        Ok(table.records[*slot].clone())
    }

    async fn find_by_user(&self, user: User) -> Result<Vec<Record>> {
        let table = self.table.read().await;
        let Some(slots) = table.by_user.get(&user.id) else {
            return Ok(Vec::new());
        };

        Ok(slots.iter().map(|&slot| table.records[slot].clone()).collect())
    }

    async fn insert(&self, record: Record) -> Result<()> {
        self.table.write().await.insert(record)
    }

    async fn batch_upsert(&self, records: Vec<Record>) -> Result<()> {
        let mut table = self.table.write().await;
        for record in records {
            table.upsert(record);
        }
        Ok(())
    }

    async fn batch_soft_delete(&self, records: Vec<Record>) -> Result<u64> {
        let mut table = self.table.write().await;
        let mut skipped = 0;
        for record in &records {
            if !table.soft_delete(record) {
                skipped += 1;
            }
        }
        Ok(skipped)
    }

    async fn create_user(&self) -> Result<User> {
        let mut table = self.table.write().await;
        let id = table.next_user_id;
        table.next_user_id += 1;
        Ok(User::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, path: &str, user_id: i64) -> Record {
        Record {
            original_url: url.to_string(),
            shortened_path: path.to_string(),
            user_id,
            ..Record::default()
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_both_keys() {
        let store = MemoryStore::new();

        store
            .insert(record("https://example.com", "abc123", 1))
            .await
            .unwrap();

        let by_url = store.find_by_original_url("https://example.com").await.unwrap();
        assert_eq!(by_url.shortened_path, "abc123");

        let by_path = store.find_by_shortened_path("abc123").await.unwrap();
        assert_eq!(by_path.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn find_misses_are_not_found() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.find_by_original_url("https://nope.com").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.find_by_shortened_path("nope").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn insert_duplicate_url_is_rejected_and_slot_unchanged() {
        let store = MemoryStore::new();

        store
            .insert(record("https://example.com", "first", 1))
            .await
            .unwrap();

        let err = store
            .insert(record("https://example.com", "second", 2))
            .await
            .unwrap_err();

        match err {
            StoreError::NotUnique { existing } => {
                assert_eq!(existing.shortened_path, "first");
                assert_eq!(existing.user_id, 1);
            }
            other => panic!("expected NotUnique, got {other:?}"),
        }

        // The rejected insert must not have touched the existing slot.
        let stored = store.find_by_original_url("https://example.com").await.unwrap();
        assert_eq!(stored.shortened_path, "first");
        assert!(matches!(
            store.find_by_shortened_path("second").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn find_by_user_returns_empty_for_unknown_user() {
        let store = MemoryStore::new();

        let records = store.find_by_user(User::new(42)).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn find_by_user_includes_soft_deleted_records() {
        let store = MemoryStore::new();
        let r = record("https://example.com", "abc123", 7);

        store.insert(r.clone()).await.unwrap();
        store.batch_soft_delete(vec![r]).await.unwrap();

        let records = store.find_by_user(User::new(7)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_deleted);
    }

    #[tokio::test]
    async fn batch_upsert_reindexes_shortened_path() {
        let store = MemoryStore::new();

        store
            .batch_upsert(vec![record("https://example.com", "path1", 1)])
            .await
            .unwrap();
        store
            .batch_upsert(vec![record("https://example.com", "path2", 1)])
            .await
            .unwrap();

        assert!(matches!(
            store.find_by_shortened_path("path1").await,
            Err(StoreError::NotFound)
        ));
        let moved = store.find_by_shortened_path("path2").await.unwrap();
        assert_eq!(moved.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn batch_upsert_moves_slot_between_users() {
        let store = MemoryStore::new();

        store
            .batch_upsert(vec![record("https://example.com", "abc123", 1)])
            .await
            .unwrap();
        store
            .batch_upsert(vec![record("https://example.com", "abc123", 2)])
            .await
            .unwrap();

        let old_owner = store.find_by_user(User::new(1)).await.unwrap();
        assert!(old_owner.is_empty());

        let new_owner = store.find_by_user(User::new(2)).await.unwrap();
        assert_eq!(new_owner.len(), 1);
        assert_eq!(new_owner[0].original_url, "https://example.com");
    }

    #[tokio::test]
    async fn batch_upsert_overwrites_existing_from_plain_insert() {
        let store = MemoryStore::new();

        store
            .insert(record("https://example.com", "old", 1))
            .await
            .unwrap();
        store
            .batch_upsert(vec![record("https://example.com", "new", 1)])
            .await
            .unwrap();

        let stored = store.find_by_original_url("https://example.com").await.unwrap();
        assert_eq!(stored.shortened_path, "new");
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn batch_upsert_duplicates_within_batch_are_last_write_wins() {
        let store = MemoryStore::new();

        store
            .batch_upsert(vec![
                record("https://example.com", "first", 1),
                record("https://example.com", "second", 2),
            ])
            .await
            .unwrap();

        let stored = store.find_by_original_url("https://example.com").await.unwrap();
        assert_eq!(stored.shortened_path, "second");
        assert_eq!(stored.user_id, 2);
        assert!(matches!(
            store.find_by_shortened_path("first").await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn soft_delete_requires_matching_owner() {
        let store = MemoryStore::new();
        store
            .insert(record("https://example.com", "abc123", 7))
            .await
            .unwrap();

        let skipped = store
            .batch_soft_delete(vec![record("https://example.com", "abc123", 8)])
            .await
            .unwrap();
        assert_eq!(skipped, 1);

        let stored = store.find_by_shortened_path("abc123").await.unwrap();
        assert!(!stored.is_deleted);
    }

    #[tokio::test]
    async fn soft_delete_flips_flag_and_keeps_indices() {
        let store = MemoryStore::new();
        let r = record("https://example.com", "abc123", 7);
        store.insert(r.clone()).await.unwrap();

        let skipped = store.batch_soft_delete(vec![r]).await.unwrap();
        assert_eq!(skipped, 0);

        // Deleted records stay reachable through every index.
        let by_path = store.find_by_shortened_path("abc123").await.unwrap();
        assert!(by_path.is_deleted);
        let by_url = store.find_by_original_url("https://example.com").await.unwrap();
        assert!(by_url.is_deleted);
        assert_eq!(store.find_by_user(User::new(7)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn soft_delete_skips_unknown_paths() {
        let store = MemoryStore::new();

        let skipped = store
            .batch_soft_delete(vec![record("https://example.com", "missing", 7)])
            .await
            .unwrap();
        assert_eq!(skipped, 1);
    }

    #[tokio::test]
    async fn create_user_hands_out_monotonic_ids() {
        let store = MemoryStore::new();

        assert_eq!(store.create_user().await.unwrap().id, 1);
        assert_eq!(store.create_user().await.unwrap().id, 2);
        assert_eq!(store.create_user().await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn restore_recomputes_user_counter() {
        let store = MemoryStore::new();

        store
            .restore(vec![
                record("https://a.com", "aaa", 3),
                record("https://b.com", "bbb", 7),
            ])
            .await;

        assert_eq!(store.create_user().await.unwrap().id, 8);
        assert_eq!(store.records().await.len(), 2);
    }

    #[tokio::test]
    async fn restore_skips_duplicate_urls() {
        let store = MemoryStore::new();

        store
            .restore(vec![
                record("https://a.com", "aaa", 1),
                record("https://a.com", "bbb", 2),
            ])
            .await;

        let stored = store.find_by_original_url("https://a.com").await.unwrap();
        assert_eq!(stored.shortened_path, "aaa");
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_and_reads() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert(record(
                        &format!("https://example{i}.com"),
                        &format!("path-{i:03}"),
                        1,
                    ))
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let stored = store
                .find_by_shortened_path(&format!("path-{i:03}"))
                .await
                .unwrap();
            assert_eq!(stored.original_url, format!("https://example{i}.com"));
        }
        assert_eq!(store.find_by_user(User::new(1)).await.unwrap().len(), 10);
    }
}
