//! # ohmycert-core
//!
//! Core library for the ohmycert CLI providing:
//! - Configuration loading (ohmycert.yaml, embedded defaults, environment)
//! - ETag-based change detection against a remote object store
//! - Certificate deployment into the local TLS directory
//! - Delimited-region patching of the proxy's dynamic configuration
//! - Sync state persistence (db.json)

pub mod config;
pub mod deploy;
pub mod error;
pub mod observer;
pub mod patch;
pub mod source;
pub mod state;
pub mod sync;
pub mod types;
pub mod utils;

pub use config::{CertSyncConfig, ConfigLoader};
pub use error::{Error, Result};
pub use observer::{NoOpObserver, RecordingObserver, SyncEvent, SyncObserver, TracingObserver};
pub use source::{CertSource, HttpCertSource};
pub use state::{StateStore, SyncState};
pub use sync::{SyncOptions, SyncReport, Synchronizer};
pub use types::{CertOutcome, CertificateMaterial, CheckOutcome};
