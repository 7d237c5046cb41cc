use serde::{Deserialize, Serialize};

/// A stored URL mapping.
///
/// This is the unit of storage for every backend and also the on-disk
/// line format of the file persistence adapter. Missing fields default
/// to their zero values when deserializing, so older dump files stay
/// readable after the model grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// The original URL that was shortened. Unique among live records.
    pub original_url: String,
    /// The generated short path. Unique among live records.
    pub shortened_path: String,
    /// Caller-supplied opaque tag used to pair batch-create requests
    /// with responses. Not indexed.
    pub correlation_id: String,
    /// Owning user; `0` means "no owner".
    pub user_id: i64,
    /// Soft-delete flag. A deleted record stays physically present and
    /// keeps all of its index entries.
    pub is_deleted: bool,
}

/// A user identity handed out by a store's counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct User {
    pub id: i64,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}
