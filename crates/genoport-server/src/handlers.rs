use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::bootstrap::{MetadataBootstrapper, default_documents};
use crate::error::ApiError;
use crate::manifest::{ManifestSink, SinkClosed, write_manifest};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Genoport Portal",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Readiness probes the document store; a portal whose store is
/// unreachable is not ready.
pub async fn readyz(State(state): State<AppState>) -> Response {
    match state.store.index_exists(&state.config.manifest.index).await {
        Ok(_) => (StatusCode::OK, Json(HealthResponse { status: "ready" })).into_response(),
        Err(e) => {
            warn!(error = %e, category = %e.category(), "Readiness check failed");
            ApiError::StoreUnavailable(e).into_response()
        }
    }
}

/// Sink writing manifest chunks into the response body channel.
struct ChannelSink {
    tx: mpsc::Sender<Result<Bytes, Infallible>>,
}

#[async_trait]
impl ManifestSink for ChannelSink {
    async fn write(&mut self, chunk: &str) -> Result<(), SinkClosed> {
        self.tx
            .send(Ok(Bytes::from(chunk.as_bytes().to_vec())))
            .await
            .map_err(|_| SinkClosed)
    }
}

/// Streams the file manifest as TSV.
///
/// The export runs in a background task feeding the response body
/// through a bounded channel. When the client disconnects the body is
/// dropped, the channel closes, and the cancellation predicate stops
/// the export before its next page fetch. An export that fails midway
/// simply stops sending, leaving the response truncated.
pub async fn download_manifest(State(state): State<AppState>) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(16);
    let probe = tx.clone();
    let store = state.store.clone();
    let settings = state.config.manifest.clone();

    tokio::spawn(async move {
        let mut sink = ChannelSink { tx };
        match write_manifest(store, &settings, &mut sink, move || !probe.is_closed()).await {
            Ok(summary) => info!(
                pages = summary.pages,
                records = summary.records,
                outcome = ?summary.outcome,
                "Manifest download finished"
            ),
            Err(e) => warn!(error = %e, "Manifest download aborted"),
        }
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/tab-separated-values; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"manifest.tsv\"",
            ),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

/// On-demand metadata sync: runs the full bootstrap against the store.
pub async fn sync_metadata(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let bootstrapper = MetadataBootstrapper::new(
        state.store.clone(),
        default_documents(&state.config),
        &state.config.bootstrap,
    );
    bootstrapper.run().await?;
    Ok(StatusCode::NO_CONTENT)
}
