//! # genoport-server
//!
//! HTTP server for the Genoport genomics data-portal backend.
//!
//! The server aggregates file metadata from a document store and
//! exposes it to the front-end dashboard. Its two stateful pieces are
//! the idempotent metadata bootstrap ([`bootstrap`]) that converges the
//! portal's configuration documents at startup or on demand, and the
//! paginated manifest export ([`manifest`]) that streams the file
//! manifest as TSV.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod middleware;
pub mod observability;
pub mod server;

pub use bootstrap::{BootstrapDocument, BootstrapError, MetadataBootstrapper, default_documents};
pub use config::{AppConfig, BootstrapSettings, ManifestSettings, ServerConfig};
pub use error::ApiError;
pub use manifest::{
    FileRecord, MANIFEST_HEADER, ManifestError, ManifestOutcome, ManifestPager, ManifestSink,
    ManifestSummary, write_manifest,
};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{AppState, GenoportServer, ServerBuilder, build_app};
