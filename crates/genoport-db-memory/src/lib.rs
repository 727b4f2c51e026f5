//! # genoport-db-memory
//!
//! In-memory [`DocumentStore`](genoport_storage::DocumentStore) backend.
//!
//! This backend keeps every index as an insertion-ordered list of
//! documents behind a `tokio::sync::RwLock`. It exists for tests and
//! local development; production deployments use `genoport-db-elastic`.

mod store;

pub use store::InMemoryStore;
