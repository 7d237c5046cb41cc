//! Long-lived service tasks and URL-creation logic for Keyhole.
//!
//! Everything here depends on the `Store` trait, never on a concrete
//! backend, so the in-memory and Postgres stores stay interchangeable.

pub mod create;
pub mod deleter;
pub mod dumper;
pub mod generator;

pub use create::UrlService;
pub use deleter::{BatchDeleter, DeleteHandle};
pub use dumper::StorageDumper;
pub use generator::{PathGenerator, RandHexGenerator};
