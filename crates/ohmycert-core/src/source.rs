//! Remote certificate source
//!
//! Certificates live in an object-storage bucket as two objects per name:
//! `{base_url}{name}.crt` and `{base_url}{name}.key`. Change detection uses the
//! ETag returned by a HEAD request on the certificate object.

use crate::config::CertSyncConfig;
use crate::error::{Error, Result};
use crate::types::{CertificateMaterial, CheckOutcome};
use async_trait::async_trait;
use reqwest::header::ETAG;
use std::time::Duration;
use tracing::trace;

/// Source of certificate material
#[async_trait]
pub trait CertSource: Send + Sync {
    /// Location of the certificate object, used for logging
    fn describe(&self, name: &str) -> String;

    /// Check whether the remote certificate differs from the known fingerprint.
    ///
    /// Fails with `Error::CheckFailure` when the remote cannot be queried.
    async fn check_changed(&self, name: &str, known: Option<&str>) -> Result<CheckOutcome>;

    /// Download the certificate and its private key.
    ///
    /// Fails with `Error::FetchFailure` unless both downloads succeed.
    async fn retrieve(&self, name: &str) -> Result<CertificateMaterial>;
}

/// HTTP-backed certificate source
pub struct HttpCertSource {
    client: reqwest::Client,
    config: CertSyncConfig,
}

impl HttpCertSource {
    /// Create a source using the configured base URL, timeout and user agent
    pub fn new(config: &CertSyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(Duration::from_secs(config.network.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn download(&self, name: &str, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch_failure(name, format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch_failure(
                name,
                format!("GET {} returned {}", url, status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::fetch_failure(name, format!("reading {}: {}", url, e)))?;

        trace!(cert = name, url = url, bytes = body.len(), "downloaded");
        Ok(body.to_vec())
    }
}

#[async_trait]
impl CertSource for HttpCertSource {
    fn describe(&self, name: &str) -> String {
        self.config.cert_url(name)
    }

    async fn check_changed(&self, name: &str, known: Option<&str>) -> Result<CheckOutcome> {
        let url = self.config.cert_url(name);
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| Error::check_failure(name, format!("HEAD {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::check_failure(
                name,
                format!("HEAD {} returned {}", url, status),
            ));
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        trace!(cert = name, etag = ?etag, known = ?known, "HEAD succeeded");
        Ok(CheckOutcome::compare(known, etag))
    }

    async fn retrieve(&self, name: &str) -> Result<CertificateMaterial> {
        let cert_url = self.config.cert_url(name);
        let key_url = self.config.key_url(name);

        let (cert, key) = tokio::try_join!(
            self.download(name, &cert_url),
            self.download(name, &key_url)
        )?;

        Ok(CertificateMaterial { cert, key })
    }
}
