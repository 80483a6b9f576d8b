//! Configuration management for sightline
//!
//! Default config location: ~/.sightline/config.toml

use crate::error::Error;
use crate::index::{parse_zone, IndexResolver};
use crate::Result;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Port used when an endpoint is given as a bare host
pub const DEFAULT_PORT: u16 = 9200;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub partition_cache: PartitionCacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// `host`, `host:port` or a full URL
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoints() -> Vec<String> {
    vec![format!("localhost:{}", DEFAULT_PORT)]
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            protocol: Protocol::default(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Parse every configured endpoint into a base URL.
    ///
    /// Bare `host[:port]` entries get the `http://` scheme, a lowercased host
    /// and port 9200 when none is given. Entries that already carry a scheme
    /// are taken as written.
    pub fn endpoint_urls(&self) -> Result<Vec<Url>> {
        if self.endpoints.is_empty() {
            return Err(Error::Config("no backend endpoint configured".to_string()));
        }
        self.endpoints.iter().map(|e| parse_endpoint(e)).collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credentials for basic auth, only when a username is set
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .map(|user| (user, self.password.as_deref()))
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let invalid = |e: url::ParseError| Error::Config(format!("invalid endpoint '{}': {}", raw, e));

    if raw.contains("://") {
        return Url::parse(raw).map_err(invalid);
    }

    // a bracketed IPv6 host keeps its colons
    let (host, port) = match raw.find(']') {
        Some(end) if raw.starts_with('[') => (&raw[..=end], raw[end + 1..].strip_prefix(':')),
        _ => match raw.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (raw, None),
        },
    };
    let port = match port {
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("invalid port in endpoint '{}'", raw)))?,
        None if host.len() == raw.len() => DEFAULT_PORT,
        None => return Err(Error::Config(format!("invalid endpoint '{}'", raw))),
    };
    if host.is_empty() {
        return Err(Error::Config(format!("missing host in endpoint '{}'", raw)));
    }

    Url::parse(&format!("http://{}:{}", host.to_lowercase(), port)).map_err(invalid)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Partitions are named `<prefix>-yyyy.mm.dd`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Fixed UTC offset used for partition days and histogram buckets
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_prefix() -> String {
    "gravitee".to_string()
}

fn default_time_zone() -> String {
    "+00:00".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            time_zone: default_time_zone(),
        }
    }
}

impl IndexConfig {
    pub fn zone(&self) -> Result<FixedOffset> {
        parse_zone(&self.time_zone)
    }

    pub fn resolver(&self) -> Result<IndexResolver> {
        if self.prefix.trim().is_empty() {
            return Err(Error::Config("index prefix must not be empty".to_string()));
        }
        Ok(IndexResolver::new(self.prefix.clone(), self.zone()?))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartitionCacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for PartitionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl PartitionCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sightline")
        .join("config.toml")
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    let home = || {
        dirs::home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
    };
    if let Some(rest) = s.strip_prefix("~/") {
        Ok(home()?.join(rest))
    } else if s == "~" {
        home()
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from default location (~/.sightline/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_or_default(&default_config_path())
    }

    /// Load config from a file that must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let path = expand_tilde(path)?;
        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path, or fall back to defaults when it is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let path = expand_tilde(path)?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.backend.endpoint_urls()?;
        self.index.resolver()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.index.prefix, "gravitee");
        assert_eq!(config.backend.timeout_secs, 30);
        assert!(!config.partition_cache.enabled);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_bare_host_gets_default_port() {
        let url = parse_endpoint("ES-Node1").unwrap();
        assert_eq!(url.as_str(), "http://es-node1:9200/");
    }

    #[test]
    fn test_host_and_port() {
        let url = parse_endpoint("localhost:9300").unwrap();
        assert_eq!(url.port(), Some(9300));
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_full_url_kept() {
        let url = parse_endpoint("https://search.example.com:443/es").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/es");
    }

    #[test]
    fn test_bracketed_ipv6_host() {
        let url = parse_endpoint("[::1]").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:9200/");

        let url = parse_endpoint("[fe80::1]:9300").unwrap();
        assert_eq!(url.port(), Some(9300));
        assert_eq!(url.host_str(), Some("[fe80::1]"));

        assert!(matches!(parse_endpoint("[::1]9200"), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(matches!(parse_endpoint("host:abc"), Err(Error::Config(_))));
        assert!(matches!(parse_endpoint(":9200"), Err(Error::Config(_))));
    }

    #[test]
    fn test_no_endpoints_rejected() {
        let backend = BackendConfig {
            endpoints: vec![],
            ..Default::default()
        };
        assert!(backend.endpoint_urls().is_err());
    }

    #[test]
    fn test_credentials_only_with_username() {
        let mut backend = BackendConfig::default();
        assert!(backend.credentials().is_none());
        backend.username = Some("elastic".to_string());
        backend.password = Some("changeme".to_string());
        assert_eq!(backend.credentials(), Some(("elastic", Some("changeme"))));
    }

    #[test]
    fn test_index_resolver_from_config() {
        let index = IndexConfig {
            prefix: "metrics".to_string(),
            time_zone: "+01:00".to_string(),
        };
        let resolver = index.resolver().unwrap();
        assert_eq!(resolver.prefix(), "metrics");
        assert_eq!(resolver.zone_offset(), "+01:00");
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let index = IndexConfig {
            prefix: " ".to_string(),
            ..Default::default()
        };
        assert!(index.resolver().is_err());
    }
}
