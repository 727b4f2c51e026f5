//! # genoport-storage
//!
//! Document-store abstraction layer for the Genoport portal backend.
//!
//! This crate defines the traits and types that all document-store
//! backends must implement. It does not contain any implementations -
//! those are provided by separate crates (`genoport-db-elastic`,
//! `genoport-db-memory`).
//!
//! ## Overview
//!
//! The main trait is [`DocumentStore`], which defines the contract for:
//! - Index lifecycle (`create_index`, `index_exists`)
//! - Document reads and writes (`get_document`, `index_document`)
//! - Offset-paginated search (`search`)
//!
//! ## Example
//!
//! ```ignore
//! use genoport_storage::{DocumentStore, PageRequest, StorageError};
//!
//! async fn first_page(
//!     store: &dyn DocumentStore,
//!     index: &str,
//! ) -> Result<Vec<serde_json::Value>, StorageError> {
//!     let page = store.search(index, &PageRequest::page(0, 100)).await?;
//!     Ok(page.hits)
//! }
//! ```

mod error;
mod traits;
mod types;

// Re-export everything from submodules
pub use error::{ErrorCategory, StorageError};
pub use traits::DocumentStore;
pub use types::{PageRequest, RefreshPolicy, SearchPage};

/// Type alias for a shared document-store trait object.
pub type DynDocumentStore = std::sync::Arc<dyn DocumentStore>;
