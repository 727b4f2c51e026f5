use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection options for the Elasticsearch backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Optional basic-auth user.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional basic-auth password.
    #[serde(default)]
    pub password: Option<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_url() -> String {
    "http://localhost:9200".into()
}
fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ElasticConfig {
    /// Creates a config pointing at the given base URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Returns the per-request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ElasticConfig::default();
        assert_eq!(config.url, "http://localhost:9200");
        assert!(config.username.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = ElasticConfig::new("http://es:9200")
            .with_basic_auth("elastic", "secret")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.url, "http://es:9200");
        assert_eq!(config.username.as_deref(), Some("elastic"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.timeout_ms, 5000);
    }
}
