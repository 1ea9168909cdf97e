//! Sync state persistence (db.json)
//!
//! The state file records, per certificate name, the ETag of the remote
//! certificate at the time it was last deployed:
//!
//! ```json
//! {
//!   "certs": {
//!     "example.com": "\"5d41402abc4b2a76b9719d911017c592\""
//!   }
//! }
//! ```
//!
//! Other top-level keys are carried through untouched.

use crate::error::{Error, Result};
use crate::utils::write_atomic;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Mapping from certificate name to the last deployed ETag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    certs: BTreeMap<String, String>,

    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl SyncState {
    /// Recorded fingerprint for a certificate, if it was ever synced
    pub fn fingerprint(&self, name: &str) -> Option<&str> {
        self.certs.get(name).map(String::as_str)
    }

    /// Record the fingerprint of a deployed certificate
    pub fn record(&mut self, name: impl Into<String>, fingerprint: impl Into<String>) {
        self.certs.insert(name.into(), fingerprint.into());
    }

    /// Number of recorded certificates
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether no certificate was ever recorded
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

impl<N: Into<String>, F: Into<String>> FromIterator<(N, F)> for SyncState {
    fn from_iter<I: IntoIterator<Item = (N, F)>>(iter: I) -> Self {
        let mut state = SyncState::default();
        for (name, fingerprint) in iter {
            state.record(name, fingerprint);
        }
        state
    }
}

/// File-backed store for `SyncState`
#[derive(Debug, Clone)]
pub struct StateStore {
    path: Utf8PathBuf,
}

impl StateStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// A missing, unreadable or unparsable file yields an empty state.
    pub fn load(&self) -> SyncState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path, "no state file yet, starting empty");
                return SyncState::default();
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "failed to read state file, starting empty");
                return SyncState::default();
            }
        };

        match serde_json::from_str::<SyncState>(&raw) {
            Ok(state) => {
                debug!(path = %self.path, entries = state.len(), "state loaded");
                state
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "state file is corrupt, starting empty");
                SyncState::default()
            }
        }
    }

    /// Persist the full state, replacing the previous file
    pub fn commit(&self, state: &SyncState) -> Result<()> {
        let mut json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state_io(&self.path, e.to_string()))?;
        json.push('\n');

        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| Error::state_io(&self.path, e.to_string()))?;

        debug!(path = %self.path, entries = state.len(), "state committed");
        Ok(())
    }
}
