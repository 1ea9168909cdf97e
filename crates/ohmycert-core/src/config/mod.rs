//! Configuration types for ohmycert.yaml

mod loader;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};

use crate::error::{Error, Result};
use crate::patch::{END_MARKER, START_MARKER};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Resolved sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CertSyncConfig {
    /// Certificate names to manage, in the order they appear in the fragment
    #[serde(default)]
    pub cert_names: Vec<String>,

    /// Prefix for remote objects; `{base_url}{name}.crt` and `{base_url}{name}.key`
    #[serde(default)]
    pub base_url: String,

    /// Local directory receiving the certificate files
    #[serde(default)]
    pub ssl_dir: Utf8PathBuf,

    /// Proxy dynamic configuration file containing the marker region
    #[serde(default)]
    pub tls_config_path: Utf8PathBuf,

    /// Sync state file
    #[serde(default = "default_state_path")]
    pub state_path: Utf8PathBuf,

    /// Directory the proxy reads the certificates from
    #[serde(default = "default_cert_ref_dir")]
    pub cert_ref_dir: String,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Timeout for every HEAD/GET request in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Number of certificates checked and fetched in parallel
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            max_concurrency: default_max_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_state_path() -> Utf8PathBuf {
    Utf8PathBuf::from("db.json")
}
fn default_cert_ref_dir() -> String {
    "/etc/traefik/ssl".to_string()
}
fn default_http_timeout() -> u64 {
    30
}
fn default_max_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    format!(
        "ohmycert/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

impl CertSyncConfig {
    /// Build a configuration from the required fields, everything else defaulted
    pub fn new(
        cert_names: Vec<String>,
        base_url: impl Into<String>,
        ssl_dir: impl Into<Utf8PathBuf>,
        tls_config_path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            cert_names,
            base_url: base_url.into(),
            ssl_dir: ssl_dir.into(),
            tls_config_path: tls_config_path.into(),
            state_path: default_state_path(),
            cert_ref_dir: default_cert_ref_dir(),
            network: NetworkConfig::default(),
        }
    }

    /// Set the state file path
    pub fn with_state_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Check the configuration for values the sync cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.cert_names.is_empty() {
            return Err(Error::invalid_config("cert-names must list at least one certificate"));
        }

        let mut seen = HashSet::new();
        for name in &self.cert_names {
            if name.trim().is_empty() {
                return Err(Error::invalid_config("cert-names contains an empty name"));
            }
            if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
                return Err(Error::invalid_config(format!(
                    "certificate name '{}' must not contain path separators",
                    name
                )));
            }
            if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(Error::invalid_config(format!(
                    "certificate name {:?} must not contain whitespace or control characters",
                    name
                )));
            }
            if name.contains(START_MARKER) || name.contains(END_MARKER) {
                return Err(Error::invalid_config(format!(
                    "certificate name '{}' must not contain a region marker",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_config(format!(
                    "certificate name '{}' is listed more than once",
                    name
                )));
            }
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::invalid_config(format!(
                "base-url '{}' is not a valid URL: {}",
                self.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_config(format!(
                "base-url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.ssl_dir.as_str().is_empty() {
            return Err(Error::invalid_config("ssl-dir is required"));
        }
        if self.tls_config_path.as_str().is_empty() {
            return Err(Error::invalid_config("tls-config-path is required"));
        }
        if self.state_path.as_str().is_empty() {
            return Err(Error::invalid_config("state-path is required"));
        }
        if self.network.http_timeout_secs == 0 {
            return Err(Error::invalid_config("network.http-timeout-secs must be positive"));
        }
        if self.network.max_concurrency == 0 {
            return Err(Error::invalid_config("network.max-concurrency must be positive"));
        }

        Ok(())
    }

    /// Remote URL of the certificate object
    pub fn cert_url(&self, name: &str) -> String {
        format!("{}{}.crt", self.base_url, name)
    }

    /// Remote URL of the private key object
    pub fn key_url(&self, name: &str) -> String {
        format!("{}{}.key", self.base_url, name)
    }
}
