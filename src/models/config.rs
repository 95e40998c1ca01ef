//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Bucket;

/// Upper bound on watched buckets per process.
pub const MAX_BUCKETS: usize = 10;

/// Root application configuration, as read from `watcher.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Object storage namespace shared by all buckets
    #[serde(default)]
    pub namespace: String,

    /// Bucket names to watch
    #[serde(default)]
    pub buckets: Vec<String>,

    /// Interval between two polls of the same bucket
    #[serde(default = "defaults::poll_interval", with = "duration_str")]
    pub poll_interval: Duration,

    /// Callback URL receiving one POST per change
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// What a bucket task does when its persisted snapshot is unreadable
    #[serde(default)]
    pub on_corrupt_snapshot: CorruptSnapshotPolicy,

    /// Snapshot persistence backend
    #[serde(default)]
    pub state: StateConfig,

    /// Object storage connection settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Graceful shutdown settings
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, using defaults when the file does not exist.
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(&path) {
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "No config file at {:?}, using defaults",
                    path.as_ref()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.settings().map(|_| ())
    }

    /// Validate and produce the settings consumed by the watcher core.
    pub fn settings(&self) -> Result<WatcherSettings> {
        let namespace = self.namespace.trim();
        if namespace.is_empty() {
            return Err(AppError::validation("namespace is required"));
        }

        if self.buckets.is_empty() {
            return Err(AppError::validation("at least one bucket must be specified"));
        }
        if self.buckets.len() > MAX_BUCKETS {
            return Err(AppError::validation(format!(
                "a maximum of {MAX_BUCKETS} buckets is supported, got {}",
                self.buckets.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &self.buckets {
            if name.trim().is_empty() {
                return Err(AppError::validation("bucket names must not be empty"));
            }
            if !seen.insert(name.trim()) {
                return Err(AppError::validation(format!("bucket {name} listed twice")));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(AppError::validation("poll_interval must be > 0"));
        }
        if self.http.timeout.is_zero() {
            return Err(AppError::validation("http.timeout must be > 0"));
        }

        let webhook_url = parse_webhook_url(self.webhook_url.as_deref())?;

        if self.state.backend == StateBackend::S3 && self.state.bucket.is_none() {
            return Err(AppError::validation(
                "state.bucket is required for the s3 state backend",
            ));
        }

        Ok(WatcherSettings {
            buckets: self
                .buckets
                .iter()
                .map(|name| Bucket::new(namespace, name.trim()))
                .collect(),
            poll_interval: self.poll_interval,
            webhook_url,
            on_corrupt_snapshot: self.on_corrupt_snapshot,
            shutdown_grace: self.shutdown.grace_period,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            buckets: Vec::new(),
            poll_interval: defaults::poll_interval(),
            webhook_url: None,
            on_corrupt_snapshot: CorruptSnapshotPolicy::default(),
            state: StateConfig::default(),
            storage: StorageConfig::default(),
            http: HttpConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

fn parse_webhook_url(raw: Option<&str>) -> Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("webhook_url is required"))?;
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::validation(format!(
            "webhook_url must be an absolute http(s) URL, got {raw}"
        )));
    }
    Ok(url)
}

/// Validated values the watcher core runs with.
#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub buckets: Vec<Bucket>,
    pub poll_interval: Duration,
    pub webhook_url: Url,
    pub on_corrupt_snapshot: CorruptSnapshotPolicy,
    pub shutdown_grace: Duration,
}

/// Behavior when a bucket's persisted snapshot exists but cannot be loaded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorruptSnapshotPolicy {
    /// Stop that bucket's task without polling
    #[default]
    Halt,
    /// Start over from an empty snapshot
    Reset,
}

/// Where snapshots are persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Local,
    S3,
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackend,

    /// Root directory for the local backend
    #[serde(default = "defaults::state_dir")]
    pub dir: PathBuf,

    /// Bucket holding snapshots for the s3 backend
    #[serde(default)]
    pub bucket: Option<String>,

    /// Key prefix for the s3 backend
    #[serde(default = "defaults::state_prefix")]
    pub prefix: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::default(),
            dir: defaults::state_dir(),
            bucket: None,
            prefix: defaults::state_prefix(),
        }
    }
}

/// S3-compatible object storage connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Region override; the SDK default chain applies otherwise
    #[serde(default)]
    pub region: Option<String>,

    /// Address buckets by path instead of virtual host
    #[serde(default)]
    pub force_path_style: bool,
}

/// Outbound HTTP settings for listing and webhook calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(default = "defaults::http_timeout", with = "duration_str")]
    pub timeout: Duration,

    /// User-Agent header for webhook requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: defaults::http_timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Graceful shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long to wait for bucket tasks after a stop request
    #[serde(default = "defaults::grace_period", with = "duration_str")]
    pub grace_period: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period: defaults::grace_period(),
        }
    }
}

/// Parse a human-readable duration such as `30s` or `2m`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    humantime::parse_duration(input.trim())
        .map_err(|e| AppError::config(format!("invalid duration '{input}': {e}")))
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

mod defaults {
    use std::path::PathBuf;
    use std::time::Duration;

    pub fn poll_interval() -> Duration {
        Duration::from_secs(30)
    }
    pub fn http_timeout() -> Duration {
        Duration::from_secs(30)
    }
    pub fn grace_period() -> Duration {
        Duration::from_secs(30)
    }
    pub fn user_agent() -> String {
        concat!("objectstore-watcher/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn state_dir() -> PathBuf {
        PathBuf::from("state")
    }
    pub fn state_prefix() -> String {
        "snapshots".into()
    }
}
