//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Config file (ohmycert.yaml or the path given with --config)
//! 3. Environment variables (OHMYCERT_* prefix)
//!
//! Relative paths read from the file or the embedded defaults are resolved
//! against the directory containing the config file. Paths given through
//! environment variables are used as-is.

use super::CertSyncConfig;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use tracing::debug;

/// Default config file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ohmycert.yaml";

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Configuration loader
pub struct ConfigLoader {
    config_path: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given config file, or `ohmycert.yaml` when none is given
    pub fn new(config_path: Option<&Utf8Path>) -> Self {
        Self {
            config_path: config_path
                .map(Utf8Path::to_path_buf)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Path of the config file this loader reads
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> Result<CertSyncConfig> {
        if !self.config_path.exists() {
            return Err(Error::config_not_found(self.config_path.as_str()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            Error::YamlParse(inner) => {
                Error::invalid_config(format!("Failed to parse {}: {}", self.config_path, inner))
            }
            other => other,
        })?;
        let base_dir = self.config_path.parent().unwrap_or(Utf8Path::new(""));
        let config = rebase_paths(config, base_dir);
        let config = Self::apply_env_overrides(config)?;

        config.validate()?;
        debug!(
            path = %self.config_path,
            certs = config.cert_names.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Merge a YAML document over the embedded defaults, without env overrides or validation
    pub fn from_yaml(content: &str) -> Result<CertSyncConfig> {
        let mut merged = Self::load_embedded_value("defaults.yaml")?;
        let overlay: Value = serde_yaml_ng::from_str(content)?;
        if !overlay.is_null() {
            if !overlay.is_mapping() {
                return Err(Error::invalid_config(
                    "configuration must be a YAML mapping at the top level",
                ));
            }
            merge_values(&mut merged, overlay);
        }

        Ok(serde_yaml_ng::from_value(merged)?)
    }

    /// Commented starter configuration written by `config init`
    pub fn starter_template() -> Result<String> {
        Self::load_embedded_text("ohmycert.example.yaml")
    }

    fn load_embedded_text(filename: &str) -> Result<String> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;
        Ok(content.to_string())
    }

    fn load_embedded_value(filename: &str) -> Result<Value> {
        let content = Self::load_embedded_text(filename)?;
        serde_yaml_ng::from_str(&content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: CertSyncConfig) -> Result<CertSyncConfig> {
        if let Ok(val) = env::var("OHMYCERT_CERT_NAMES") {
            config.cert_names = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(val) = env::var("OHMYCERT_BASE_URL") {
            config.base_url = val;
        }

        if let Ok(val) = env::var("OHMYCERT_SSL_DIR") {
            config.ssl_dir = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("OHMYCERT_TLS_CONFIG_PATH") {
            config.tls_config_path = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("OHMYCERT_STATE_PATH") {
            config.state_path = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("OHMYCERT_CERT_REF_DIR") {
            config.cert_ref_dir = val;
        }

        if let Ok(val) = env::var("OHMYCERT_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("OHMYCERT_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("OHMYCERT_MAX_CONCURRENCY") {
            config.network.max_concurrency = val.parse().map_err(|_| {
                Error::invalid_config("OHMYCERT_MAX_CONCURRENCY must be a valid number")
            })?;
        }

        Ok(config)
    }
}

/// Resolve relative file paths against `base_dir`
fn rebase_paths(mut config: CertSyncConfig, base_dir: &Utf8Path) -> CertSyncConfig {
    for path in [
        &mut config.ssl_dir,
        &mut config.tls_config_path,
        &mut config.state_path,
    ] {
        if path.is_relative() {
            *path = base_dir.join(&*path);
        }
    }
    config
}

/// Recursively merge `overlay` into `base`; mappings merge, everything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
cert-names:
  - example.com
  - api.example.com
base-url: "https://bucket.oss.example.com/certs/"
ssl-dir: /srv/traefik/ssl
tls-config-path: /srv/traefik/dynamic/tls.yaml
"#;

    fn write_config(content: &str) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("ohmycert.yaml"))
            .expect("Invalid UTF-8 path");
        fs::write(&path, content).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_defaults_fill_optional_fields() {
        let config = ConfigLoader::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.cert_names, vec!["example.com", "api.example.com"]);
        assert_eq!(config.state_path, Utf8PathBuf::from("db.json"));
        assert_eq!(config.cert_ref_dir, "/etc/traefik/ssl");
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.network.max_concurrency, 4);
        assert!(config.network.user_agent.starts_with("ohmycert/"));
    }

    #[test]
    fn test_nested_network_override_keeps_other_defaults() {
        let content = format!("{}network:\n  http-timeout-secs: 5\n", MINIMAL);
        let config = ConfigLoader::from_yaml(&content).unwrap();
        assert_eq!(config.network.http_timeout_secs, 5);
        assert_eq!(config.network.max_concurrency, 4);
    }

    #[test]
    fn test_non_mapping_document_rejected() {
        assert!(ConfigLoader::from_yaml("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_starter_template_parses() {
        let template = ConfigLoader::starter_template().unwrap();
        let config = ConfigLoader::from_yaml(&template).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_missing_file() {
        let loader = ConfigLoader::new(Some(Utf8Path::new("/nonexistent/ohmycert.yaml")));
        assert!(matches!(
            loader.load(),
            Err(Error::ConfigNotFound { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let (_temp, path) = write_config(MINIMAL);
        let config = ConfigLoader::new(Some(&path)).load().unwrap();
        assert_eq!(config.base_url, "https://bucket.oss.example.com/certs/");
        assert_eq!(config.ssl_dir, Utf8PathBuf::from("/srv/traefik/ssl"));
    }

    #[test]
    #[serial]
    fn test_relative_paths_follow_config_file() {
        let content = r#"
cert-names: [example.com]
base-url: "https://bucket.oss.example.com/certs/"
ssl-dir: ssl
tls-config-path: /srv/traefik/dynamic/tls.yaml
"#;
        let (temp, path) = write_config(content);
        let dir = Utf8Path::from_path(temp.path()).expect("Invalid UTF-8 path");

        let config = ConfigLoader::new(Some(&path)).load().unwrap();

        // the test process runs from the crate directory, not the config directory
        assert_ne!(env::current_dir().unwrap(), temp.path());
        assert_eq!(config.state_path, dir.join("db.json"));
        assert!(config.state_path.is_absolute());
        assert_eq!(config.ssl_dir, dir.join("ssl"));
        assert_eq!(
            config.tls_config_path,
            Utf8PathBuf::from("/srv/traefik/dynamic/tls.yaml")
        );
    }

    #[test]
    fn test_relative_config_path_keeps_relative_paths() {
        let config = ConfigLoader::from_yaml(MINIMAL).unwrap();
        let config = rebase_paths(config, Utf8Path::new(""));
        assert_eq!(config.state_path, Utf8PathBuf::from("db.json"));
    }

    #[test]
    #[serial]
    fn test_env_path_override_is_not_rebased() {
        let (_temp, path) = write_config(MINIMAL);

        env::set_var("OHMYCERT_STATE_PATH", "state/db.json");
        let result = ConfigLoader::new(Some(&path)).load();
        env::remove_var("OHMYCERT_STATE_PATH");

        assert_eq!(result.unwrap().state_path, Utf8PathBuf::from("state/db.json"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (_temp, path) = write_config(MINIMAL);

        env::set_var("OHMYCERT_CERT_NAMES", "one.example.com, two.example.com");
        env::set_var("OHMYCERT_HTTP_TIMEOUT_SECS", "7");
        let result = ConfigLoader::new(Some(&path)).load();
        env::remove_var("OHMYCERT_CERT_NAMES");
        env::remove_var("OHMYCERT_HTTP_TIMEOUT_SECS");

        let config = result.unwrap();
        assert_eq!(config.cert_names, vec!["one.example.com", "two.example.com"]);
        assert_eq!(config.network.http_timeout_secs, 7);
    }

    #[test]
    #[serial]
    fn test_invalid_env_number() {
        let (_temp, path) = write_config(MINIMAL);

        env::set_var("OHMYCERT_MAX_CONCURRENCY", "lots");
        let result = ConfigLoader::new(Some(&path)).load();
        env::remove_var("OHMYCERT_MAX_CONCURRENCY");

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
