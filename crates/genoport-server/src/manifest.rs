//! Paginated manifest export.
//!
//! Produces the file manifest as tab-separated text, fetched from the
//! document store in fixed-size pages and handed to a consumer
//! incrementally. The pager is a plain pull iterator: each call fetches
//! the next offset, and the first empty page terminates the stream.
//! Cancellation is a precondition checked by the driving loop before
//! each fetch; a fetch already in flight always completes and its page
//! is written before cancellation takes effect.
//!
//! Unlike the bootstrapper there is no retry here: a query failure
//! aborts the export and the bytes already written stay written, so an
//! abnormally ended stream must be treated as incomplete by the
//! consumer.

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;
use tracing::info;

use genoport_storage::{DynDocumentStore, PageRequest, StorageError};

use crate::config::ManifestSettings;

/// First line of every manifest.
pub const MANIFEST_HEADER: &str = "object_id\tstudy_id\tdata_type";

/// Flat projection of a file document.
///
/// Only the three projected fields are serialized; the full source
/// document is carried as opaque passthrough data.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub object_id: String,
    pub study_id: String,
    pub data_type: String,
    /// The unprojected source document.
    pub source: Value,
}

impl FileRecord {
    /// Projects a file document. Missing fields render as empty cells.
    #[must_use]
    pub fn from_document(doc: &Value) -> Self {
        Self {
            object_id: str_field(doc, "object_id"),
            study_id: str_field(doc, "study_id"),
            data_type: str_field(doc, "data_type"),
            source: doc.clone(),
        }
    }

    /// Serializes the record as one tab-separated line (no newline).
    #[must_use]
    pub fn tsv_row(&self) -> String {
        format!("{}\t{}\t{}", self.object_id, self.study_id, self.data_type)
    }
}

fn str_field(doc: &Value, field: &str) -> String {
    doc.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Pull-based page iterator over a file index.
///
/// Pages are fetched in strictly increasing offset order starting at 0;
/// the first empty page latches the pager into its terminal state and
/// no further store calls are made.
pub struct ManifestPager {
    store: DynDocumentStore,
    index: String,
    page_size: usize,
    next_page: usize,
    done: bool,
}

impl ManifestPager {
    pub fn new(store: DynDocumentStore, index: impl Into<String>, page_size: usize) -> Self {
        Self {
            store,
            index: index.into(),
            page_size,
            next_page: 0,
            done: false,
        }
    }

    /// Fetches the next page, or `None` once the index is exhausted.
    ///
    /// # Errors
    ///
    /// A query failure propagates immediately; the pager does not retry.
    pub async fn next_page(&mut self) -> Result<Option<Vec<FileRecord>>, StorageError> {
        if self.done {
            return Ok(None);
        }

        let request = PageRequest::page(self.next_page, self.page_size);
        let page = self.store.search(&self.index, &request).await?;

        if page.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.next_page += 1;
        Ok(Some(page.hits.iter().map(FileRecord::from_document).collect()))
    }
}

/// Raised by a sink whose consumer has gone away.
#[derive(Debug, thiserror::Error)]
#[error("manifest consumer disconnected")]
pub struct SinkClosed;

/// Incremental text sink the manifest is written to.
#[async_trait]
pub trait ManifestSink: Send {
    /// Writes one chunk of manifest text.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] when the consumer is no longer reading.
    async fn write(&mut self, chunk: &str) -> Result<(), SinkClosed>;
}

/// How an export run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOutcome {
    /// The index was exhausted.
    Completed,
    /// The cancellation predicate stopped the run.
    Cancelled,
}

/// Counters for a finished export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSummary {
    pub pages: usize,
    pub records: usize,
    pub outcome: ManifestOutcome,
}

/// Errors that abort an export run.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// A page query failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The consumer disconnected mid-write.
    #[error(transparent)]
    ConsumerGone(#[from] SinkClosed),
}

/// Drives a full manifest export: header line, then one TSV line per
/// record, page by page, pausing `page_delay` between pages as a
/// throttle for the downstream transport.
///
/// `keep_going` is evaluated before each page fetch; returning `false`
/// ends the run with [`ManifestOutcome::Cancelled`] and no further
/// store calls.
///
/// # Errors
///
/// A store or sink failure aborts the run; output already written is
/// not retracted.
pub async fn write_manifest<S, F>(
    store: DynDocumentStore,
    settings: &ManifestSettings,
    sink: &mut S,
    mut keep_going: F,
) -> Result<ManifestSummary, ManifestError>
where
    S: ManifestSink,
    F: FnMut() -> bool,
{
    let mut pager = ManifestPager::new(store, &settings.index, settings.page_size);
    let mut pages = 0usize;
    let mut records = 0usize;

    sink.write(&format!("{MANIFEST_HEADER}\n")).await?;

    loop {
        if !keep_going() {
            info!(pages, records, "Manifest export cancelled by consumer");
            return Ok(ManifestSummary {
                pages,
                records,
                outcome: ManifestOutcome::Cancelled,
            });
        }

        let Some(page) = pager.next_page().await? else {
            break;
        };

        for record in &page {
            sink.write(&format!("{}\n", record.tsv_row())).await?;
        }
        pages += 1;
        records += page.len();

        if !settings.page_delay().is_zero() {
            sleep(settings.page_delay()).await;
        }
    }

    info!(pages, records, "Manifest export completed");
    Ok(ManifestSummary {
        pages,
        records,
        outcome: ManifestOutcome::Completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use genoport_db_memory::InMemoryStore;
    use genoport_storage::{DocumentStore, RefreshPolicy, SearchPage};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(page_size: usize) -> ManifestSettings {
        ManifestSettings {
            index: "portal-files".into(),
            page_size,
            page_delay_ms: 0,
        }
    }

    async fn seeded_store(count: usize) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..count {
            store
                .index_document(
                    "portal-files",
                    &format!("doc-{i}"),
                    &json!({
                        "object_id": format!("OBJ{i}"),
                        "study_id": "S1",
                        "data_type": "FASTQ",
                        "file_size": 1024 * i,
                    }),
                    RefreshPolicy::None,
                )
                .await
                .unwrap();
        }
        store
    }

    /// Wrapper that counts search calls.
    struct CountingStore {
        inner: Arc<InMemoryStore>,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn create_index(&self, index: &str) -> Result<(), StorageError> {
            self.inner.create_index(index).await
        }
        async fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
            self.inner.index_exists(index).await
        }
        async fn index_document(
            &self,
            index: &str,
            id: &str,
            content: &Value,
            refresh: RefreshPolicy,
        ) -> Result<(), StorageError> {
            self.inner.index_document(index, id, content, refresh).await
        }
        async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError> {
            self.inner.get_document(index, id).await
        }
        async fn search(&self, index: &str, page: &PageRequest) -> Result<SearchPage, StorageError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.inner.search(index, page).await
        }
        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    #[derive(Default)]
    struct VecSink {
        chunks: Vec<String>,
    }

    #[async_trait]
    impl ManifestSink for VecSink {
        async fn write(&mut self, chunk: &str) -> Result<(), SinkClosed> {
            self.chunks.push(chunk.to_string());
            Ok(())
        }
    }

    /// Sink that rejects every write, as a disconnected consumer would.
    struct ClosedSink;

    #[async_trait]
    impl ManifestSink for ClosedSink {
        async fn write(&mut self, _chunk: &str) -> Result<(), SinkClosed> {
            Err(SinkClosed)
        }
    }

    #[tokio::test]
    async fn pager_yields_pages_in_order_then_terminates() {
        let store = seeded_store(5).await;
        let mut pager = ManifestPager::new(store, "portal-files", 2);

        let first = pager.next_page().await.unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].object_id, "OBJ0");
        assert_eq!(first[1].object_id, "OBJ1");

        let second = pager.next_page().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].object_id, "OBJ2");

        let third = pager.next_page().await.unwrap().unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].object_id, "OBJ4");

        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pager_is_terminal_after_exhaustion() {
        let store = Arc::new(CountingStore {
            inner: seeded_store(1).await,
            searches: AtomicUsize::new(0),
        });
        let mut pager = ManifestPager::new(store.clone(), "portal-files", 10);

        assert!(pager.next_page().await.unwrap().is_some());
        assert!(pager.next_page().await.unwrap().is_none());
        let after_exhaustion = store.searches.load(Ordering::SeqCst);

        // Latched: no further store calls once exhausted.
        assert!(pager.next_page().await.unwrap().is_none());
        assert_eq!(store.searches.load(Ordering::SeqCst), after_exhaustion);
    }

    #[tokio::test]
    async fn writes_header_and_rows_exactly() {
        let store = Arc::new(InMemoryStore::new());
        store
            .index_document(
                "portal-files",
                "a",
                &json!({"object_id": "A", "study_id": "S1", "data_type": "FASTQ"}),
                RefreshPolicy::None,
            )
            .await
            .unwrap();

        let mut sink = VecSink::default();
        let summary = write_manifest(store, &settings(10), &mut sink, || true)
            .await
            .unwrap();

        assert_eq!(summary.outcome, ManifestOutcome::Completed);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.records, 1);
        assert_eq!(sink.chunks[0], "object_id\tstudy_id\tdata_type\n");
        assert_eq!(sink.chunks[1], "A\tS1\tFASTQ\n");
        assert_eq!(sink.chunks.len(), 2);
    }

    #[tokio::test]
    async fn missing_fields_render_as_empty_cells() {
        let record = FileRecord::from_document(&json!({"object_id": "A", "file_size": 7}));
        assert_eq!(record.tsv_row(), "A\t\t");
        assert_eq!(record.source["file_size"], 7);
    }

    #[tokio::test]
    async fn exports_all_pages_for_uneven_division() {
        let store = seeded_store(5).await;
        let mut sink = VecSink::default();
        let summary = write_manifest(store, &settings(2), &mut sink, || true)
            .await
            .unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.records, 5);
        // Header + 5 record lines.
        assert_eq!(sink.chunks.len(), 6);
        assert_eq!(sink.chunks[5], "OBJ4\tS1\tFASTQ\n");
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_fetch() {
        let store = Arc::new(CountingStore {
            inner: seeded_store(6).await,
            searches: AtomicUsize::new(0),
        });

        // Allow exactly one fetch, then cancel.
        let mut checks = 0;
        let mut sink = VecSink::default();
        let summary = write_manifest(store.clone(), &settings(2), &mut sink, || {
            checks += 1;
            checks <= 1
        })
        .await
        .unwrap();

        assert_eq!(summary.outcome, ManifestOutcome::Cancelled);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.records, 2);
        assert_eq!(store.searches.load(Ordering::SeqCst), 1);
        // Header plus the single yielded page.
        assert_eq!(sink.chunks.len(), 3);
    }

    #[tokio::test]
    async fn cancellation_before_first_fetch_yields_nothing() {
        let store = Arc::new(CountingStore {
            inner: seeded_store(3).await,
            searches: AtomicUsize::new(0),
        });

        let mut sink = VecSink::default();
        let summary = write_manifest(store.clone(), &settings(2), &mut sink, || false)
            .await
            .unwrap();

        assert_eq!(summary.outcome, ManifestOutcome::Cancelled);
        assert_eq!(summary.pages, 0);
        assert_eq!(store.searches.load(Ordering::SeqCst), 0);
        // Only the header was written.
        assert_eq!(sink.chunks, vec!["object_id\tstudy_id\tdata_type\n".to_string()]);
    }

    /// Store that fails searches from a given offset onward.
    struct FailingFromOffset {
        inner: Arc<InMemoryStore>,
        fail_from: usize,
    }

    #[async_trait]
    impl DocumentStore for FailingFromOffset {
        async fn create_index(&self, index: &str) -> Result<(), StorageError> {
            self.inner.create_index(index).await
        }
        async fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
            self.inner.index_exists(index).await
        }
        async fn index_document(
            &self,
            index: &str,
            id: &str,
            content: &Value,
            refresh: RefreshPolicy,
        ) -> Result<(), StorageError> {
            self.inner.index_document(index, id, content, refresh).await
        }
        async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError> {
            self.inner.get_document(index, id).await
        }
        async fn search(&self, index: &str, page: &PageRequest) -> Result<SearchPage, StorageError> {
            if page.from >= self.fail_from {
                return Err(StorageError::connection_error("shard failure"));
            }
            self.inner.search(index, page).await
        }
        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn query_failure_aborts_without_retracting_output() {
        let store = Arc::new(FailingFromOffset {
            inner: seeded_store(6).await,
            fail_from: 2,
        });

        let mut sink = VecSink::default();
        let err = write_manifest(store, &settings(2), &mut sink, || true)
            .await
            .unwrap_err();

        assert!(matches!(err, ManifestError::Storage(_)));
        // Header and the first page survived; nothing else was written.
        assert_eq!(sink.chunks.len(), 3);
        assert_eq!(sink.chunks[1], "OBJ0\tS1\tFASTQ\n");
        assert_eq!(sink.chunks[2], "OBJ1\tS1\tFASTQ\n");
    }

    #[tokio::test]
    async fn closed_sink_aborts_export() {
        let store = seeded_store(3).await;
        let mut sink = ClosedSink;
        let err = write_manifest(store, &settings(2), &mut sink, || true)
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::ConsumerGone(_)));
    }
}
