//! Error types for ohmycert-core

use camino::Utf8PathBuf;
use thiserror::Error;

/// Result type alias using ohmycert-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Structural problems found while locating the marker region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerProblem {
    /// The start sentinel does not occur in the file
    MissingStart,
    /// The end sentinel does not occur in the file
    MissingEnd,
    /// The start sentinel occurs more than once
    DuplicateStart,
    /// The end sentinel occurs more than once
    DuplicateEnd,
    /// The end sentinel appears before the start sentinel
    EndBeforeStart,
    /// Both sentinels are on the same line, leaving no interior to replace
    SameLine,
    /// The replacement text itself contains a sentinel
    MarkerInFragment,
}

impl std::fmt::Display for MarkerProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::MissingStart => "start marker not found",
            Self::MissingEnd => "end marker not found",
            Self::DuplicateStart => "start marker appears more than once",
            Self::DuplicateEnd => "end marker appears more than once",
            Self::EndBeforeStart => "end marker appears before start marker",
            Self::SameLine => "start and end markers share a line",
            Self::MarkerInFragment => "replacement text contains a marker",
        };
        f.write_str(msg)
    }
}

/// Core error types for ohmycert
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata check against the remote object failed
    #[error("Check failed for {name}: {reason}")]
    CheckFailure { name: String, reason: String },

    /// Retrieval of the certificate or key failed
    #[error("Fetch failed for {name}: {reason}")]
    FetchFailure { name: String, reason: String },

    /// Writing a deployed file failed
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file does not contain exactly one well-formed marker region
    #[error("Malformed marker region in {path}: {problem}")]
    PatchStructureFailure {
        path: Utf8PathBuf,
        problem: MarkerProblem,
    },

    /// Persisting the sync state failed
    #[error("Failed to persist state to {path}: {message}")]
    StateIoFailure { path: Utf8PathBuf, message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a check failure error
    pub fn check_failure(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CheckFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch failure error
    pub fn fetch_failure(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a write failure error
    pub fn write_failure(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Create a patch structure error
    pub fn patch_structure(path: impl Into<Utf8PathBuf>, problem: MarkerProblem) -> Self {
        Self::PatchStructureFailure {
            path: path.into(),
            problem,
        }
    }

    /// Create a state persistence error
    pub fn state_io(path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self::StateIoFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error only affects a single certificate and the run may continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CheckFailure { .. } | Self::FetchFailure { .. } | Self::WriteFailure { .. }
        )
    }
}
