//! Configuration module for Octopace.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! All intervals and timeouts are expressed in milliseconds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{GroupId, OperationId};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Octopace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub rate_limits: RateLimitsConfig,
    pub grouping: GroupingConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the underlying REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Root URL of the remote API.
    pub base_url: String,
    /// Opaque token sent as a bearer credential. `None` sends no credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// Path segment inserted between the base URL and each operation path
    /// (e.g. `/api/v3` for an enterprise server).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    /// Outbound proxy. Absent means direct connections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    /// Headers attached to every request (API version, media type, ...).
    pub headers: BTreeMap<String, String>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Whole-request timeout in seconds. `None` disables the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Outbound proxy settings.
///
/// A bare string is a plain forward proxy URL; a mapping describes a
/// tunnelling (CONNECT) proxy for encrypted traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyConfig {
    /// Plain HTTP(S) forward proxy, e.g. `http://proxy.local:3128`.
    Forward(String),
    /// CONNECT tunnel through `host:port`.
    Tunnel(TunnelProxyConfig),
}

/// Tunnelling proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelProxyConfig {
    pub host: String,
    pub port: u16,
    /// When `false`, server certificates are not verified.
    #[serde(default = "default_true")]
    pub reject_unauthorized: bool,
    /// Extra headers sent with the CONNECT request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

/// Per-group and global pacing intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitsConfig {
    /// Group name → minimum milliseconds between two calls in that group.
    pub groups: BTreeMap<String, u64>,
    /// Minimum milliseconds between any two calls. `0` disables the global gate.
    pub global: u64,
}

/// Static mapping of operations to rate-limit groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Group used for namespaces without an explicit mapping.
    pub default_group: String,
    /// Namespace → group.
    pub namespaces: BTreeMap<String, String>,
    /// `namespace.operation` → group. Takes precedence over `namespaces`.
    pub operations: BTreeMap<String, String>,
}

/// Retry and backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum additional attempts after the first one.
    pub retries: u32,
    /// Multiplicative growth of the backoff delay per attempt.
    pub factor: f64,
    /// Backoff delay before the first retry, in milliseconds.
    pub min_timeout_ms: u64,
    /// Upper bound for any single backoff delay, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timeout_ms: Option<u64>,
    /// HTTP statuses that are surfaced immediately instead of retried.
    pub do_not_retry: Vec<u16>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/octopace/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("octopace")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default REST API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default value of the API version header.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

impl Default for TransportConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "accept".to_string(),
            "application/vnd.github+json".to_string(),
        );
        headers.insert(
            "x-github-api-version".to_string(),
            DEFAULT_API_VERSION.to_string(),
        );
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credential: None,
            path_prefix: None,
            proxy: None,
            headers,
            user_agent: format!("octopace/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: Some(30),
        }
    }
}

impl Default for RateLimitsConfig {
    /// 5000 core requests per hour and 30 search requests per minute,
    /// rounded up to whole-millisecond spacing.
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(GroupId::CORE.to_string(), 720);
        groups.insert(GroupId::SEARCH.to_string(), 2000);
        Self { groups, global: 0 }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("search".to_string(), GroupId::SEARCH.to_string());
        Self {
            default_group: GroupId::CORE.to_string(),
            namespaces,
            operations: BTreeMap::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            factor: 2.0,
            min_timeout_ms: 1000,
            max_timeout_ms: None,
            do_not_retry: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

impl RateLimitsConfig {
    /// Configured interval for `group`, if any.
    pub fn interval_for(&self, group: &str) -> Option<Duration> {
        self.groups.get(group).copied().map(Duration::from_millis)
    }

    /// Global interval, or `None` when the global gate is disabled.
    pub fn global_interval(&self) -> Option<Duration> {
        (self.global > 0).then(|| Duration::from_millis(self.global))
    }
}

impl RetryConfig {
    /// Backoff delay before the first retry.
    pub fn min_timeout(&self) -> Duration {
        Duration::from_millis(self.min_timeout_ms)
    }

    /// Cap for a single backoff delay, if configured.
    pub fn max_timeout(&self) -> Option<Duration> {
        self.max_timeout_ms.map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"retry.factor"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: String| {
            errors.push(ValidationError { field, message });
        };

        // --- transport ---
        if !is_http_url(&self.transport.base_url) {
            push(
                "transport.base_url".into(),
                format!("must be an http(s) URL: {}", self.transport.base_url),
            );
        }
        if matches!(self.transport.credential.as_deref(), Some("")) {
            push(
                "transport.credential".into(),
                "must not be empty when set".into(),
            );
        }
        if let Some(prefix) = &self.transport.path_prefix {
            if !prefix.starts_with('/') {
                push(
                    "transport.path_prefix".into(),
                    "must start with '/'".into(),
                );
            }
        }
        match &self.transport.proxy {
            Some(ProxyConfig::Forward(url)) if !is_http_url(url) => {
                push(
                    "transport.proxy".into(),
                    format!("must be an http(s) URL: {url}"),
                );
            }
            Some(ProxyConfig::Tunnel(tunnel)) => {
                if tunnel.host.is_empty() {
                    push("transport.proxy.host".into(), "must not be empty".into());
                }
                if tunnel.port == 0 {
                    push(
                        "transport.proxy.port".into(),
                        "must be greater than 0".into(),
                    );
                }
            }
            _ => {}
        }
        if self.transport.user_agent.is_empty() {
            push(
                "transport.user_agent".into(),
                "must not be empty".into(),
            );
        }
        if self.transport.timeout_secs == Some(0) {
            push(
                "transport.timeout_secs".into(),
                "must be greater than 0 when set".into(),
            );
        }

        // --- rate_limits ---
        for group in self.rate_limits.groups.keys() {
            if let Err(e) = GroupId::new(group.as_str()) {
                push(format!("rate_limits.groups.{group}"), e.to_string());
            }
        }

        // --- grouping ---
        let default_group = &self.grouping.default_group;
        if let Err(e) = GroupId::new(default_group.as_str()) {
            push("grouping.default_group".into(), e.to_string());
        } else if !self.rate_limits.groups.contains_key(default_group) {
            push(
                "rate_limits.groups".into(),
                format!("missing interval for default group '{default_group}'"),
            );
        }
        for (namespace, group) in &self.grouping.namespaces {
            if let Err(e) = GroupId::new(group.as_str()) {
                push(format!("grouping.namespaces.{namespace}"), e.to_string());
            }
        }
        for (operation, group) in &self.grouping.operations {
            if let Err(e) = operation.parse::<OperationId>() {
                push(format!("grouping.operations.{operation}"), e.to_string());
            }
            if let Err(e) = GroupId::new(group.as_str()) {
                push(format!("grouping.operations.{operation}"), e.to_string());
            }
        }

        // --- retry ---
        if !self.retry.factor.is_finite() || self.retry.factor <= 0.0 {
            push(
                "retry.factor".into(),
                format!("must be a positive number, got {}", self.retry.factor),
            );
        }
        if let Some(max) = self.retry.max_timeout_ms {
            if max < self.retry.min_timeout_ms {
                push(
                    "retry.max_timeout_ms".into(),
                    format!(
                        "max_timeout_ms ({}) must not be below min_timeout_ms ({})",
                        max, self.retry.min_timeout_ms
                    ),
                );
            }
        }
        for status in &self.retry.do_not_retry {
            if !(100..=599).contains(status) {
                push(
                    "retry.do_not_retry".into(),
                    format!("invalid HTTP status {status}"),
                );
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level".into(),
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use octopace_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .base_url("https://github.example.com")
///     .path_prefix("/api/v3")
///     .group_interval_ms("core", 150)
///     .global_interval_ms(50)
///     .retries(2)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- transport ---

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.transport.base_url = url.into();
        self
    }

    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.config.transport.credential = Some(credential.into());
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.transport.path_prefix = Some(prefix.into());
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.transport.proxy = Some(proxy);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .transport
            .headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.transport.user_agent = user_agent.into();
        self
    }

    pub fn timeout_secs(mut self, seconds: Option<u64>) -> Self {
        self.config.transport.timeout_secs = seconds;
        self
    }

    // --- rate_limits ---

    pub fn group_interval_ms(mut self, group: impl Into<String>, ms: u64) -> Self {
        self.config.rate_limits.groups.insert(group.into(), ms);
        self
    }

    pub fn global_interval_ms(mut self, ms: u64) -> Self {
        self.config.rate_limits.global = ms;
        self
    }

    // --- grouping ---

    pub fn default_group(mut self, group: impl Into<String>) -> Self {
        self.config.grouping.default_group = group.into();
        self
    }

    pub fn namespace_group(mut self, namespace: impl Into<String>, group: impl Into<String>) -> Self {
        self.config
            .grouping
            .namespaces
            .insert(namespace.into(), group.into());
        self
    }

    pub fn operation_group(mut self, operation: impl Into<String>, group: impl Into<String>) -> Self {
        self.config
            .grouping
            .operations
            .insert(operation.into(), group.into());
        self
    }

    // --- retry ---

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retry.retries = retries;
        self
    }

    pub fn retry_factor(mut self, factor: f64) -> Self {
        self.config.retry.factor = factor;
        self
    }

    pub fn retry_min_timeout_ms(mut self, ms: u64) -> Self {
        self.config.retry.min_timeout_ms = ms;
        self
    }

    pub fn retry_max_timeout_ms(mut self, ms: u64) -> Self {
        self.config.retry.max_timeout_ms = Some(ms);
        self
    }

    pub fn do_not_retry(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.config.retry.do_not_retry = statuses.into_iter().collect();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
