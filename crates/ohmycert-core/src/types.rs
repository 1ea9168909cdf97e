//! Shared types for the sync pipeline

/// Result of a metadata check against the remote certificate object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether the certificate must be (re-)fetched
    pub changed: bool,

    /// ETag reported by the remote, if any
    pub fingerprint: Option<String>,
}

impl CheckOutcome {
    /// Decide whether a remote fingerprint differs from the recorded one.
    ///
    /// A missing remote fingerprint always counts as changed, as does a
    /// certificate that was never synced.
    pub fn compare(known: Option<&str>, remote: Option<String>) -> Self {
        let changed = match (&remote, known) {
            (Some(remote), Some(known)) => remote != known,
            _ => true,
        };
        Self {
            changed,
            fingerprint: remote,
        }
    }
}

/// Certificate and private key for one certificate name
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateMaterial {
    /// PEM-encoded certificate chain
    pub cert: Vec<u8>,

    /// PEM-encoded private key
    pub key: Vec<u8>,
}

impl std::fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("cert_bytes", &self.cert.len())
            .field("key_bytes", &self.key.len())
            .finish()
    }
}

/// Terminal state of one certificate name after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertOutcome {
    /// The HEAD check did not succeed
    CheckFailed { reason: String },

    /// The remote ETag matches the recorded one
    Unchanged,

    /// The certificate changed but could not be downloaded
    FetchFailed { reason: String },

    /// The certificate was downloaded but could not be written
    WriteFailed { reason: String },

    /// The certificate was downloaded and written to the deploy directory
    Deployed { fingerprint: Option<String> },

    /// The certificate would be downloaded (dry run only)
    Pending { fingerprint: Option<String> },
}

impl CertOutcome {
    /// Whether this outcome represents a failure for the name
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CheckFailed { .. } | Self::FetchFailed { .. } | Self::WriteFailed { .. }
        )
    }

    /// Short label used in terminal output
    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckFailed { .. } => "check failed",
            Self::Unchanged => "unchanged",
            Self::FetchFailed { .. } => "fetch failed",
            Self::WriteFailed { .. } => "write failed",
            Self::Deployed { .. } => "deployed",
            Self::Pending { .. } => "would fetch",
        }
    }
}
