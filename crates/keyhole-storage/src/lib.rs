//! Storage backends for the Keyhole URL shortener.
//!
//! `MemoryStore` is the indexed in-memory table; `FileStore` mirrors
//! its contents to a newline-delimited JSON file for restart recovery;
//! `PgStore` is the Postgres-backed alternative behind the same
//! `Store` trait.

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;
