//! Idempotent metadata bootstrap.
//!
//! Ensures the portal's configuration documents exist in the document
//! store with exactly the expected content. Safe under concurrent
//! invocation from multiple replicas: every writer writes the same
//! fixed content, so interleavings converge on the expected state.
//!
//! The write outcome is deliberately not trusted. A parallel write may
//! fail because another replica got there first, so a failed write only
//! logs a warning and the attempt is decided by reading the documents
//! back and comparing them to the expected content.

use std::collections::BTreeSet;
use std::time::Duration;

use futures_util::future;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{error, info, warn};

use genoport_storage::{DynDocumentStore, RefreshPolicy, StorageError};

use crate::config::{AppConfig, BootstrapSettings};

/// Longest pause between attempts regardless of backoff growth.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// One configuration document the bootstrapper maintains.
#[derive(Debug, Clone)]
pub struct BootstrapDocument {
    /// Index the document lives in.
    pub index: String,
    /// Document ID.
    pub id: String,
    /// Expected content; the stored document must deep-equal this.
    pub content: Value,
}

impl BootstrapDocument {
    pub fn new(index: impl Into<String>, id: impl Into<String>, content: Value) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            content,
        }
    }
}

/// Builds the two portal configuration documents from configuration:
/// the project registry entry and the file index configuration.
pub fn default_documents(cfg: &AppConfig) -> Vec<BootstrapDocument> {
    let bootstrap = &cfg.bootstrap;
    vec![
        BootstrapDocument::new(
            &bootstrap.projects_index,
            &bootstrap.project_id,
            json!({
                "id": bootstrap.project_id,
                "active": true,
                "indices": [cfg.manifest.index],
            }),
        ),
        BootstrapDocument::new(
            bootstrap.config_index(),
            "files",
            json!({
                "name": "files",
                "index": cfg.manifest.index,
                "esType": "file",
                "keyField": "object_id",
                "active": true,
                "columns": ["object_id", "study_id", "data_type"],
            }),
        ),
    ]
}

/// Errors that can occur during a bootstrap run.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A document-store operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An index did not exist even after creation reported success.
    #[error("index unavailable after creation: {index}")]
    IndexUnavailable {
        /// The index that could not be confirmed.
        index: String,
    },

    /// A document was read back with content different from the expected value.
    #[error("stored content for {index}/{id} does not match expected content")]
    ContentMismatch { index: String, id: String },

    /// A document was missing on read-back after the write phase.
    #[error("document {index}/{id} missing after write")]
    MissingDocument { index: String, id: String },
}

/// Ensures a fixed set of configuration documents exists with expected
/// content, retrying whole attempts with exponential backoff.
pub struct MetadataBootstrapper {
    store: DynDocumentStore,
    documents: Vec<BootstrapDocument>,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl MetadataBootstrapper {
    pub fn new(
        store: DynDocumentStore,
        documents: Vec<BootstrapDocument>,
        settings: &BootstrapSettings,
    ) -> Self {
        Self {
            store,
            documents,
            max_attempts: settings.max_attempts,
            retry_base_delay: settings.retry_base_delay(),
        }
    }

    /// Runs the bootstrap to completion.
    ///
    /// Attempts are retried up to the configured budget; intermediate
    /// failures are logged as warnings and only the final error is
    /// surfaced.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once all retries are exhausted.
    pub async fn run(&self) -> Result<(), BootstrapError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt().await {
                Ok(()) => {
                    info!(
                        attempt,
                        documents = self.documents.len(),
                        backend = self.store.backend_name(),
                        "Metadata bootstrap completed"
                    );
                    return Ok(());
                }
                Err(e) if attempt >= self.max_attempts => {
                    error!(attempt, error = %e, "Metadata bootstrap failed, retries exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Bootstrap attempt failed, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// One full attempt: ensure indices, write all documents in
    /// parallel, then verify by reading them back.
    async fn attempt(&self) -> Result<(), BootstrapError> {
        for index in self.distinct_indices() {
            self.store.create_index(index).await?;
            if !self.store.index_exists(index).await? {
                return Err(BootstrapError::IndexUnavailable {
                    index: index.to_string(),
                });
            }
        }

        // All writes are awaited even when one of them fails: a failure
        // may be a harmless race with a concurrent writer, and the
        // read-back below decides whether this attempt succeeded.
        let writes = self.documents.iter().map(|doc| async move {
            let result = self
                .store
                .index_document(&doc.index, &doc.id, &doc.content, RefreshPolicy::WaitFor)
                .await;
            if let Err(e) = &result {
                warn!(
                    index = %doc.index,
                    id = %doc.id,
                    error = %e,
                    "Bootstrap write failed, proceeding to verification"
                );
            }
        });
        future::join_all(writes).await;

        for doc in &self.documents {
            match self.store.get_document(&doc.index, &doc.id).await? {
                Some(stored) if stored == doc.content => {}
                Some(_) => {
                    return Err(BootstrapError::ContentMismatch {
                        index: doc.index.clone(),
                        id: doc.id.clone(),
                    });
                }
                None => {
                    return Err(BootstrapError::MissingDocument {
                        index: doc.index.clone(),
                        id: doc.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn distinct_indices(&self) -> BTreeSet<&str> {
        self.documents
            .iter()
            .map(|doc| doc.index.as_str())
            .collect()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_base_delay
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY)
    }
}
