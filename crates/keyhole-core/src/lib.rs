//! Core types and traits for the Keyhole URL shortener.
//!
//! This crate provides the shared record model, the error taxonomy,
//! and the storage capability trait implemented by both the in-memory
//! and the SQL-backed stores.

pub mod error;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use record::{Record, User};
pub use store::Store;
