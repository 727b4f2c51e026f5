//! Storage types for the document-store abstraction layer.
//!
//! This module defines all data types used by the storage traits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visibility requested for an indexing operation.
///
/// The bootstrapper writes with `WaitFor` so that the read-back
/// verification that follows observes the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// No refresh; the write becomes visible on the backend's schedule.
    #[default]
    None,
    /// Block until the write is visible to subsequent searches and reads.
    WaitFor,
    /// Force an immediate refresh after the write.
    Immediate,
}

impl std::fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::WaitFor => write!(f, "wait_for"),
            Self::Immediate => write!(f, "immediate"),
        }
    }
}

/// One page of a paginated query: a zero-based offset and a bounded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of documents to skip.
    pub from: usize,
    /// Maximum number of documents to return.
    pub size: usize,
}

impl PageRequest {
    /// Creates a new `PageRequest`.
    #[must_use]
    pub fn new(from: usize, size: usize) -> Self {
        Self { from, size }
    }

    /// Creates the request for page `index` with a fixed `page_size`.
    #[must_use]
    pub fn page(index: usize, page_size: usize) -> Self {
        Self {
            from: index * page_size,
            size: page_size,
        }
    }
}

/// Result of a paginated search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    /// The matching documents, in backend order.
    pub hits: Vec<Value>,
    /// Total count of matching documents, if the backend reports one.
    pub total: Option<u64>,
}

impl SearchPage {
    /// Creates a new empty `SearchPage`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a new `SearchPage` with hits.
    #[must_use]
    pub fn with_hits(hits: Vec<Value>) -> Self {
        Self { hits, total: None }
    }

    /// Sets the total count.
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Returns the number of hits in this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the page contains no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_request_offsets() {
        assert_eq!(PageRequest::page(0, 100), PageRequest::new(0, 100));
        assert_eq!(PageRequest::page(3, 100), PageRequest::new(300, 100));
        assert_eq!(PageRequest::page(2, 7), PageRequest::new(14, 7));
    }

    #[test]
    fn test_search_page() {
        let page = SearchPage::with_hits(vec![json!({"object_id": "A"})]).with_total(42);
        assert_eq!(page.len(), 1);
        assert!(!page.is_empty());
        assert_eq!(page.total, Some(42));

        assert!(SearchPage::empty().is_empty());
    }

    #[test]
    fn test_refresh_policy_display() {
        assert_eq!(RefreshPolicy::None.to_string(), "none");
        assert_eq!(RefreshPolicy::WaitFor.to_string(), "wait_for");
        assert_eq!(RefreshPolicy::Immediate.to_string(), "immediate");
    }
}
