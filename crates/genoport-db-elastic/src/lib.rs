//! # genoport-db-elastic
//!
//! Elasticsearch implementation of the
//! [`DocumentStore`](genoport_storage::DocumentStore) contract.
//!
//! The store talks to the cluster's REST API over plain HTTP:
//! - `PUT /{index}` to ensure an index exists (a concurrent creator's
//!   `resource_already_exists_exception` counts as success)
//! - `HEAD /{index}` for existence checks
//! - `PUT /{index}/_doc/{id}?refresh=...` for document writes
//! - `GET /{index}/_doc/{id}` for reads
//! - `POST /{index}/_search` with `{from, size, match_all}` for
//!   offset-paginated queries

mod config;
mod store;

pub use config::ElasticConfig;
pub use store::ElasticStore;
