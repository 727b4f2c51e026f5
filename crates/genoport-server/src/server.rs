use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use genoport_db_elastic::ElasticStore;
use genoport_storage::DynDocumentStore;

use crate::bootstrap::{MetadataBootstrapper, default_documents};
use crate::config::AppConfig;
use crate::{handlers, middleware as app_middleware};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: DynDocumentStore,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Manifest export
        .route("/files/manifest", get(handlers::download_manifest))
        // On-demand metadata sync
        .route("/admin/bootstrap", post(handlers::sync_metadata))
        // Middleware stack (order: request id -> cors/compression/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    config: AppConfig,
    store: Option<DynDocumentStore>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            store: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Overrides the document store; used by tests to run against the
    /// in-memory backend.
    pub fn with_store(mut self, store: DynDocumentStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the server: connects the store and runs the startup
    /// metadata bootstrap before accepting traffic.
    pub async fn build(self) -> anyhow::Result<GenoportServer> {
        let store: DynDocumentStore = match self.store {
            Some(store) => store,
            None => Arc::new(ElasticStore::new(self.config.elastic.clone())?),
        };

        let bootstrapper = MetadataBootstrapper::new(
            store.clone(),
            default_documents(&self.config),
            &self.config.bootstrap,
        );
        bootstrapper.run().await?;

        let addr = self.config.addr();
        let state = AppState {
            config: Arc::new(self.config),
            store,
        };

        Ok(GenoportServer {
            addr,
            app: build_app(state),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GenoportServer {
    addr: SocketAddr,
    app: Router,
}

impl GenoportServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
