use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use genoport_storage::{DocumentStore, PageRequest, RefreshPolicy, SearchPage, StorageError};

use crate::config::ElasticConfig;

/// Elasticsearch-backed document store.
///
/// Speaks the cluster's REST API directly over HTTP. Index creation,
/// document writes and offset-paginated searches map one-to-one onto
/// `PUT /{index}`, `PUT /{index}/_doc/{id}` and `POST /{index}/_search`.
#[derive(Debug, Clone)]
pub struct ElasticStore {
    http: reqwest::Client,
    base_url: String,
    config: ElasticConfig,
}

impl ElasticStore {
    /// Creates a new store from connection options.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Internal` if the base URL is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: ElasticConfig) -> Result<Self, StorageError> {
        let parsed = Url::parse(&config.url)
            .map_err(|e| StorageError::internal(format!("invalid elasticsearch url: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StorageError::internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            config,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(ref user) = self.config.username {
            builder = builder.basic_auth(user, self.config.password.as_deref());
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StorageError> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StorageError::connection_error(format!(
                    "request timed out after {}ms",
                    self.config.timeout_ms
                ))
            } else if e.is_connect() {
                StorageError::connection_error(format!("failed to connect to cluster: {e}"))
            } else {
                StorageError::internal(format!("request failed: {e}"))
            }
        })
    }

    /// Extracts the Elasticsearch error type from an error response body.
    fn error_type(body: &Value) -> Option<&str> {
        body.get("error")?.get("type")?.as_str()
    }

    async fn failure(&self, context: &str, response: reqwest::Response) -> StorageError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        StorageError::internal(format!("{context} failed with status {status}: {body}"))
    }
}

fn refresh_param(refresh: RefreshPolicy) -> &'static str {
    match refresh {
        RefreshPolicy::None => "false",
        RefreshPolicy::WaitFor => "wait_for",
        RefreshPolicy::Immediate => "true",
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn create_index(&self, index: &str) -> Result<(), StorageError> {
        let response = self
            .send(self.request(reqwest::Method::PUT, index))
            .await?;

        if response.status().is_success() {
            debug!(index, "Index created");
            return Ok(());
        }

        // A concurrent creator may have won the race; the cluster reports
        // that as resource_already_exists_exception, which is success for
        // ensure-semantics.
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if Self::error_type(&body) == Some("resource_already_exists_exception") {
            debug!(index, "Index already exists");
            return Ok(());
        }

        warn!(index, %status, "Index creation failed");
        Err(StorageError::internal(format!(
            "index creation for '{index}' failed with status {status}: {body}"
        )))
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
        let response = self
            .send(self.request(reqwest::Method::HEAD, index))
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            _ => Err(self.failure("index existence check", response).await),
        }
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        content: &Value,
        refresh: RefreshPolicy,
    ) -> Result<(), StorageError> {
        let response = self
            .send(
                self.request(reqwest::Method::PUT, &format!("{index}/_doc/{id}"))
                    .query(&[("refresh", refresh_param(refresh))])
                    .json(content),
            )
            .await?;

        if response.status().is_success() {
            debug!(index, id, "Document indexed");
            Ok(())
        } else if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            Err(StorageError::invalid_document(format!(
                "cluster rejected document {index}/{id}: {body}"
            )))
        } else {
            Err(self.failure("document write", response).await)
        }
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let response = self
            .send(self.request(reqwest::Method::GET, &format!("{index}/_doc/{id}")))
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let mut body: Value = response.json().await.map_err(|e| {
                    StorageError::internal(format!("malformed get response: {e}"))
                })?;
                match body.get_mut("_source") {
                    Some(source) => Ok(Some(source.take())),
                    None => Ok(None),
                }
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            _ => Err(self.failure("document read", response).await),
        }
    }

    async fn search(&self, index: &str, page: &PageRequest) -> Result<SearchPage, StorageError> {
        let query = json!({
            "from": page.from,
            "size": page.size,
            "query": { "match_all": {} },
        });

        let response = self
            .send(
                self.request(reqwest::Method::POST, &format!("{index}/_search"))
                    .json(&query),
            )
            .await?;

        if !response.status().is_success() {
            return Err(self.failure("search", response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StorageError::internal(format!("malformed search response: {e}")))?;

        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|hit| hit.get("_source").cloned())
                    .collect()
            })
            .unwrap_or_default();

        let total = body.pointer("/hits/total/value").and_then(Value::as_u64);

        Ok(SearchPage { hits, total })
    }

    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }
}
