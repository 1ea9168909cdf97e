//! Sync observation and logging
//!
//! This module provides the `SyncObserver` trait for monitoring per-certificate
//! progress of a sync run, a `TracingObserver` implementation that logs using the
//! `tracing` crate, and a `RecordingObserver` that keeps the events in memory.

use camino::Utf8Path;
use std::error::Error;
use std::sync::Mutex;

/// Observer trait for sync events
///
/// Implement this trait to receive callbacks during a sync run. Callbacks for
/// different certificate names may arrive interleaved when checks run in parallel.
pub trait SyncObserver: Send + Sync {
    /// Called before the HEAD request for a certificate
    fn on_check_started(&self, name: &str, url: &str);

    /// Called when the HEAD request did not succeed; the name is skipped this run
    fn on_check_failed(&self, name: &str, error: &dyn Error);

    /// Called when the remote ETag matches the recorded one
    fn on_unchanged(&self, name: &str, fingerprint: &str);

    /// Called before the certificate and key are downloaded
    fn on_fetch_started(&self, name: &str);

    /// Called when either download failed; the name is skipped this run
    fn on_fetch_failed(&self, name: &str, error: &dyn Error);

    /// Called when both files were written to the deploy directory
    fn on_deployed(&self, name: &str, fingerprint: Option<&str>);

    /// Called when writing a downloaded certificate failed
    fn on_write_failed(&self, name: &str, error: &dyn Error);

    /// Called after the marker region was processed
    ///
    /// `rewritten` is false when the file already contained the fragment.
    fn on_config_patched(&self, path: &Utf8Path, rewritten: bool);

    /// Called after the state file was written
    fn on_state_committed(&self, path: &Utf8Path, entries: usize);
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl SyncObserver for NoOpObserver {
    fn on_check_started(&self, _name: &str, _url: &str) {}

    fn on_check_failed(&self, _name: &str, _error: &dyn Error) {}

    fn on_unchanged(&self, _name: &str, _fingerprint: &str) {}

    fn on_fetch_started(&self, _name: &str) {}

    fn on_fetch_failed(&self, _name: &str, _error: &dyn Error) {}

    fn on_deployed(&self, _name: &str, _fingerprint: Option<&str>) {}

    fn on_write_failed(&self, _name: &str, _error: &dyn Error) {}

    fn on_config_patched(&self, _path: &Utf8Path, _rewritten: bool) {}

    fn on_state_committed(&self, _path: &Utf8Path, _entries: usize) {}
}

/// An observer that logs sync events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_check_started`, `on_fetch_started`: DEBUG
/// - `on_unchanged`, `on_deployed`, `on_config_patched`, `on_state_committed`: INFO
/// - `on_check_failed`, `on_fetch_failed`, `on_write_failed`: ERROR
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_check_started(&self, name: &str, url: &str) {
        tracing::debug!(cert = name, url = url, "checking");
    }

    fn on_check_failed(&self, name: &str, error: &dyn Error) {
        tracing::error!(cert = name, error = %error, "check failed, skipping");
    }

    fn on_unchanged(&self, name: &str, fingerprint: &str) {
        tracing::info!(cert = name, etag = fingerprint, "ETag unchanged, skipping");
    }

    fn on_fetch_started(&self, name: &str) {
        tracing::debug!(cert = name, "downloading certificate and key");
    }

    fn on_fetch_failed(&self, name: &str, error: &dyn Error) {
        tracing::error!(cert = name, error = %error, "download failed, skipping");
    }

    fn on_deployed(&self, name: &str, fingerprint: Option<&str>) {
        tracing::info!(
            cert = name,
            etag = fingerprint.unwrap_or("-"),
            "certificate deployed"
        );
    }

    fn on_write_failed(&self, name: &str, error: &dyn Error) {
        tracing::error!(cert = name, error = %error, "failed to write certificate files");
    }

    fn on_config_patched(&self, path: &Utf8Path, rewritten: bool) {
        if rewritten {
            tracing::info!(path = %path, "proxy config updated");
        } else {
            tracing::info!(path = %path, "proxy config already up to date");
        }
    }

    fn on_state_committed(&self, path: &Utf8Path, entries: usize) {
        tracing::info!(path = %path, entries = entries, "sync state written");
    }
}

/// An event captured by `RecordingObserver`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    CheckStarted { name: String },
    CheckFailed { name: String, error: String },
    Unchanged { name: String, fingerprint: String },
    FetchStarted { name: String },
    FetchFailed { name: String, error: String },
    Deployed { name: String, fingerprint: Option<String> },
    WriteFailed { name: String, error: String },
    ConfigPatched { rewritten: bool },
    StateCommitted { entries: usize },
}

/// An observer that records every event in memory
///
/// Useful for testing.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    /// Create a new recording observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<SyncEvent> {
        self.lock().clone()
    }

    /// Names for which a download was started, in event order
    pub fn fetched_names(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::FetchStarted { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded failure events
    pub fn failures(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SyncEvent::CheckFailed { .. }
                        | SyncEvent::FetchFailed { .. }
                        | SyncEvent::WriteFailed { .. }
                )
            })
            .count()
    }

    fn record(&self, event: SyncEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SyncEvent>> {
        // a poisoned lock still holds a usable event list
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SyncObserver for RecordingObserver {
    fn on_check_started(&self, name: &str, _url: &str) {
        self.record(SyncEvent::CheckStarted { name: name.into() });
    }

    fn on_check_failed(&self, name: &str, error: &dyn Error) {
        self.record(SyncEvent::CheckFailed {
            name: name.into(),
            error: error.to_string(),
        });
    }

    fn on_unchanged(&self, name: &str, fingerprint: &str) {
        self.record(SyncEvent::Unchanged {
            name: name.into(),
            fingerprint: fingerprint.into(),
        });
    }

    fn on_fetch_started(&self, name: &str) {
        self.record(SyncEvent::FetchStarted { name: name.into() });
    }

    fn on_fetch_failed(&self, name: &str, error: &dyn Error) {
        self.record(SyncEvent::FetchFailed {
            name: name.into(),
            error: error.to_string(),
        });
    }

    fn on_deployed(&self, name: &str, fingerprint: Option<&str>) {
        self.record(SyncEvent::Deployed {
            name: name.into(),
            fingerprint: fingerprint.map(String::from),
        });
    }

    fn on_write_failed(&self, name: &str, error: &dyn Error) {
        self.record(SyncEvent::WriteFailed {
            name: name.into(),
            error: error.to_string(),
        });
    }

    fn on_config_patched(&self, _path: &Utf8Path, rewritten: bool) {
        self.record(SyncEvent::ConfigPatched { rewritten });
    }

    fn on_state_committed(&self, _path: &Utf8Path, entries: usize) {
        self.record(SyncEvent::StateCommitted { entries });
    }
}

/// Implement SyncObserver for Arc<T> where T: SyncObserver
impl<T: SyncObserver + ?Sized> SyncObserver for std::sync::Arc<T> {
    fn on_check_started(&self, name: &str, url: &str) {
        (**self).on_check_started(name, url)
    }

    fn on_check_failed(&self, name: &str, error: &dyn Error) {
        (**self).on_check_failed(name, error)
    }

    fn on_unchanged(&self, name: &str, fingerprint: &str) {
        (**self).on_unchanged(name, fingerprint)
    }

    fn on_fetch_started(&self, name: &str) {
        (**self).on_fetch_started(name)
    }

    fn on_fetch_failed(&self, name: &str, error: &dyn Error) {
        (**self).on_fetch_failed(name, error)
    }

    fn on_deployed(&self, name: &str, fingerprint: Option<&str>) {
        (**self).on_deployed(name, fingerprint)
    }

    fn on_write_failed(&self, name: &str, error: &dyn Error) {
        (**self).on_write_failed(name, error)
    }

    fn on_config_patched(&self, path: &Utf8Path, rewritten: bool) {
        (**self).on_config_patched(path, rewritten)
    }

    fn on_state_committed(&self, path: &Utf8Path, entries: usize) {
        (**self).on_state_committed(path, entries)
    }
}
