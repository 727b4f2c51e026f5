use genoport_db_elastic::ElasticConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Elasticsearch connection options
    #[serde(default)]
    pub elastic: ElasticConfig,
    /// Manifest export settings (file index, page size, throttle)
    #[serde(default)]
    pub manifest: ManifestSettings,
    /// Metadata bootstrap settings (document ids, retry budget)
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Elastic validations
        if self.elastic.url.is_empty() {
            return Err("elastic.url must not be empty".into());
        }
        if self.elastic.timeout_ms == 0 {
            return Err("elastic.timeout_ms must be > 0".into());
        }
        // Manifest validations
        if self.manifest.index.is_empty() {
            return Err("manifest.index must not be empty".into());
        }
        if self.manifest.page_size == 0 {
            return Err("manifest.page_size must be > 0".into());
        }
        // Bootstrap validations
        if self.bootstrap.project_id.is_empty() {
            return Err("bootstrap.project_id must not be empty".into());
        }
        if self.bootstrap.projects_index.is_empty() {
            return Err("bootstrap.projects_index must not be empty".into());
        }
        if self.bootstrap.max_attempts == 0 {
            return Err("bootstrap.max_attempts must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Settings for the manifest export stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSettings {
    /// Index holding the file documents the manifest is built from.
    #[serde(default = "default_file_index")]
    pub index: String,
    /// Fixed number of records fetched per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pause between pages, a throttle for the downstream transport.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

fn default_file_index() -> String {
    "portal-files".into()
}
fn default_page_size() -> usize {
    100
}
fn default_page_delay_ms() -> u64 {
    500
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            index: default_file_index(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl ManifestSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// Settings for the metadata bootstrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Logical project the portal serves.
    #[serde(default = "default_project_id")]
    pub project_id: String,
    /// Index holding the project registry document.
    #[serde(default = "default_projects_index")]
    pub projects_index: String,
    /// Index holding the per-project index configuration document.
    /// Defaults to `{projects_index}-{project_id}` when unset.
    #[serde(default)]
    pub config_index: Option<String>,
    /// How many times a failed bootstrap attempt is retried.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_project_id() -> String {
    "genoport".into()
}
fn default_projects_index() -> String {
    "portal-projects".into()
}
fn default_max_attempts() -> u32 {
    10
}
fn default_retry_base_delay_ms() -> u64 {
    200
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            projects_index: default_projects_index(),
            config_index: None,
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl BootstrapSettings {
    /// Returns the index holding the per-project configuration document.
    pub fn config_index(&self) -> String {
        self.config_index
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.projects_index, self.project_id))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads configuration from an optional TOML file plus
    /// `GENOPORT__SECTION__KEY` environment overrides.
    ///
    /// A missing file is not an error; the env layer and the field
    /// defaults still apply. The merged result is validated before it
    /// is returned.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let file = PathBuf::from(path.unwrap_or("genoport.toml"));

        let mut builder = Config::builder();
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            Environment::with_prefix("GENOPORT")
                .try_parsing(true)
                .separator("__"),
        );

        let cfg: AppConfig = builder
            .build()
            .and_then(|merged| merged.try_deserialize())
            .map_err(|e| format!("configuration error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
