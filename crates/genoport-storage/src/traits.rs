//! Storage traits for the document-store abstraction layer.
//!
//! This module defines the contract that all document-store backends
//! must implement.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::{PageRequest, RefreshPolicy, SearchPage};

/// The contract for a document store holding portal metadata and file
/// documents as JSON.
///
/// Implementations must be thread-safe (`Send + Sync`). The portal
/// treats the store as an opaque capability set; it performs no
/// locking or transactions of its own and relies on the store's
/// per-document write atomicity.
///
/// # Example
///
/// ```ignore
/// use genoport_storage::{DocumentStore, StorageError};
///
/// async fn read_project(store: &dyn DocumentStore, id: &str) -> Result<serde_json::Value, StorageError> {
///     store
///         .get_document("portal-projects", id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("portal-projects", id))
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ensures an index exists, creating it if necessary.
    ///
    /// "Already exists" is success: the method returns `Ok(())` when the
    /// index was created by this call or by anyone else beforehand.
    ///
    /// # Errors
    ///
    /// Returns an error only when the index does not exist and could not
    /// be created.
    async fn create_index(&self, index: &str) -> Result<(), StorageError>;

    /// Returns whether an index exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn index_exists(&self, index: &str) -> Result<bool, StorageError>;

    /// Writes a document with the given ID, creating or fully replacing it.
    ///
    /// The `refresh` policy controls when the write becomes visible to
    /// subsequent reads and searches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidDocument` if the backend rejects the
    /// content, or an infrastructure error if the write cannot be issued.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        content: &Value,
        refresh: RefreshPolicy,
    ) -> Result<(), StorageError>;

    /// Reads a document by index and ID.
    ///
    /// Returns `None` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing
    /// documents.
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// Fetches one page of documents from an index.
    ///
    /// Documents are returned in a stable backend order so that
    /// strictly-increasing `from` offsets walk the full index without
    /// duplication.
    ///
    /// # Errors
    ///
    /// Returns an error for infrastructure issues or invalid parameters.
    async fn search(&self, index: &str, page: &PageRequest) -> Result<SearchPage, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
