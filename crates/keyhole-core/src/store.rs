use crate::error::Result;
use crate::record::{Record, User};
use async_trait::async_trait;

/// Storage capability contract shared by all backends.
///
/// Handlers and the batch deleter depend only on this trait, so the
/// in-memory store and the SQL-backed store are interchangeable. Every
/// implementation must keep the same invariants: one live slot per
/// `original_url`, one per `shortened_path`, and a slot owned by at
/// most one user at a time.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Looks up the record mapping `original_url`.
    /// A miss is `Err(StoreError::NotFound)`, not an empty record.
    async fn find_by_original_url(&self, original_url: &str) -> Result<Record>;

    /// Looks up the record mapping `shortened_path`. Soft-deleted
    /// records are still returned; callers decide on "gone" semantics.
    async fn find_by_shortened_path(&self, shortened_path: &str) -> Result<Record>;

    /// Returns all records owned by `user`, including soft-deleted
    /// ones, in no particular order. An ownerless user gets an empty
    /// vector, not an error.
    async fn find_by_user(&self, user: User) -> Result<Vec<Record>>;

    /// Stores a new record. Returns `Err(StoreError::NotUnique)`
    /// carrying the existing record if the original URL is already
    /// mapped; never overwrites.
    async fn insert(&self, record: Record) -> Result<()>;

    /// Stores every record, overwriting any existing mapping with the
    /// same `original_url` in place (the slot is reused and the path
    /// and user indices re-pointed). Duplicates within the batch are
    /// last-write-wins by input order. Never returns `NotUnique`.
    async fn batch_upsert(&self, records: Vec<Record>) -> Result<()>;

    /// Flips `is_deleted` on every record whose `shortened_path`
    /// exists and whose stored owner matches the input's `user_id`.
    /// Ownership mismatches and unknown paths are skipped; the
    /// returned count says how many inputs were skipped so callers
    /// can log it. Applied as a single critical section.
    async fn batch_soft_delete(&self, records: Vec<Record>) -> Result<u64>;

    /// Hands out the next user identity from the store's counter.
    async fn create_user(&self) -> Result<User>;
}
