//! Certificate deployment and fragment rendering
//!
//! Downloaded material is written verbatim to `{ssl_dir}/{name}.crt` and
//! `{ssl_dir}/{name}.key`. Both files are staged next to their destination
//! first and only renamed into place once both were written.

use crate::error::{Error, Result};
use crate::types::CertificateMaterial;
use crate::utils::stage_file;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

/// Writes certificate files into the deploy directory
#[derive(Debug, Clone)]
pub struct Deployer {
    ssl_dir: Utf8PathBuf,
}

impl Deployer {
    /// Create a deployer for the given directory
    pub fn new(ssl_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            ssl_dir: ssl_dir.into(),
        }
    }

    /// Local path of a certificate file
    pub fn cert_path(&self, name: &str) -> Utf8PathBuf {
        self.ssl_dir.join(format!("{}.crt", name))
    }

    /// Local path of a private key file
    pub fn key_path(&self, name: &str) -> Utf8PathBuf {
        self.ssl_dir.join(format!("{}.key", name))
    }

    /// Whether both files of a certificate exist in the deploy directory
    pub fn is_deployed(&self, name: &str) -> bool {
        self.cert_path(name).is_file() && self.key_path(name).is_file()
    }

    /// Write the certificate and key for `name`
    pub fn deploy(&self, name: &str, material: &CertificateMaterial) -> Result<()> {
        let cert_path = self.cert_path(name);
        let key_path = self.key_path(name);

        let staged_cert = stage_file(&cert_path, &material.cert)
            .map_err(|e| Error::write_failure(&cert_path, e))?;
        let staged_key = stage_file(&key_path, &material.key)
            .map_err(|e| Error::write_failure(&key_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(staged_cert.path(), std::fs::Permissions::from_mode(0o644))
                .map_err(|e| Error::write_failure(&cert_path, e))?;
            std::fs::set_permissions(staged_key.path(), std::fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::write_failure(&key_path, e))?;
        }

        staged_cert
            .persist(&cert_path)
            .map_err(|e| Error::write_failure(&cert_path, e.error))?;
        staged_key
            .persist(&key_path)
            .map_err(|e| Error::write_failure(&key_path, e.error))?;

        debug!(cert = name, dir = %self.ssl_dir, "certificate files written");
        Ok(())
    }

    /// Directory the files are written to
    pub fn ssl_dir(&self) -> &Utf8Path {
        &self.ssl_dir
    }
}

/// Render the Traefik `tls.certificates` entries for every configured name.
///
/// The output lists names in the given order, whether or not they were
/// downloaded in this run.
pub fn render_fragment(names: &[String], cert_ref_dir: &str) -> String {
    let dir = cert_ref_dir.trim_end_matches('/');
    let mut fragment = String::new();
    for name in names {
        fragment.push_str(&format!(
            "    - certFile: {dir}/{name}.crt # {name}\n      keyFile: {dir}/{name}.key\n"
        ));
    }
    fragment
}
