//! Database layer
//!
//! One SQLite table (`items`) holds every record, addressed by a composite
//! `(pk, sk)` key with a `record_type` discriminator and a JSON `attrs`
//! document. A secondary index on `(record_type, sk)` serves the delivery
//! scanner's time-bucket queries.

pub mod migrations;
pub mod pool;
pub mod store;

pub use pool::{create_pool, create_test_pool};
pub use store::{ItemKey, ItemStore, SqlxItemStore, StoreError, StoredItem};
