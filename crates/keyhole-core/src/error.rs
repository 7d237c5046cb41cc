use crate::record::Record;
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error taxonomy shared by every storage backend.
///
/// `NotFound` and `NotUnique` are normal control-flow outcomes for
/// callers: a miss means "go create one", a conflict carries the
/// existing record so the caller can return it instead of failing.
/// The remaining variants classify backend failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("no record matches the requested key")]
    NotFound,
    #[error("record for original url '{}' already exists", .existing.original_url)]
    NotUnique {
        /// The record already occupying the URL's slot.
        existing: Record,
    },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl StoreError {
    /// Returns `true` for the duplicate-URL rejection produced by `insert`.
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Self::NotUnique { .. })
    }
}
