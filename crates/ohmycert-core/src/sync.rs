//! Sync orchestration
//!
//! A run has two phases:
//!
//! 1. **Collect**: every configured certificate is checked against the recorded
//!    ETag and downloaded when it changed. Certificates are independent, so this
//!    runs with bounded concurrency; results come back in configured order.
//! 2. **Commit**: downloaded certificates are written to the deploy directory,
//!    the proxy config's marker region is rewritten with an entry for every
//!    configured certificate, and only then are the new ETags persisted.
//!
//! A failure to check or download a certificate skips that name for the run.
//! A failure to write its files withholds its ETag from the state file so the
//! next run downloads it again. A malformed marker region aborts the run
//! before the state file is touched.

use crate::config::CertSyncConfig;
use crate::deploy::{render_fragment, Deployer};
use crate::error::Result;
use crate::observer::{SyncObserver, TracingObserver};
use crate::patch::ConfigPatcher;
use crate::source::CertSource;
use crate::state::{StateStore, SyncState};
use crate::types::{CertOutcome, CertificateMaterial};
use futures::stream::{self, StreamExt};
use tracing::info;

/// Options for a single run
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Check remotes and render the fragment without downloading or writing anything
    pub dry_run: bool,
}

/// Per-certificate result of the collect phase
#[derive(Debug)]
enum Decision {
    CheckFailed(String),
    Unchanged,
    FetchFailed(String),
    Pending(Option<String>),
    Fetched {
        material: CertificateMaterial,
        fingerprint: Option<String>,
    },
}

/// Results of the collect phase, in configured order
#[derive(Debug)]
struct FetchPlan {
    entries: Vec<(String, Decision)>,
}

impl Decision {
    /// Outcome for a decision that needs no further work
    fn settle(self) -> CertOutcome {
        match self {
            Self::CheckFailed(reason) => CertOutcome::CheckFailed { reason },
            Self::Unchanged => CertOutcome::Unchanged,
            Self::FetchFailed(reason) => CertOutcome::FetchFailed { reason },
            Self::Pending(fingerprint) | Self::Fetched { fingerprint, .. } => {
                CertOutcome::Pending { fingerprint }
            }
        }
    }
}

impl FetchPlan {
    fn fetched(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, decision)| matches!(decision, Decision::Fetched { .. }))
            .count()
    }
}

/// Outcome of a sync run
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Terminal state of every configured certificate, in configured order
    pub outcomes: Vec<(String, CertOutcome)>,

    /// Fragment placed between the markers
    pub fragment: String,

    /// Whether the proxy config was rewritten (or would be, for a dry run)
    pub config_changed: bool,

    /// Whether the state file was written
    pub state_committed: bool,

    /// Whether this was a dry run
    pub dry_run: bool,
}

impl SyncReport {
    /// Outcome for a single certificate
    pub fn outcome(&self, name: &str) -> Option<&CertOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    /// Names deployed in this run
    pub fn deployed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, CertOutcome::Deployed { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names that failed at any stage
    pub fn failures(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether any certificate failed
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| outcome.is_failure())
    }
}

/// Coordinates the source, deployer, patcher and state store for one run
pub struct Synchronizer<S, O = TracingObserver> {
    config: CertSyncConfig,
    source: S,
    observer: O,
    store: StateStore,
    deployer: Deployer,
    patcher: ConfigPatcher,
}

impl<S: CertSource> Synchronizer<S, TracingObserver> {
    /// Create a synchronizer that logs through `tracing`
    pub fn new(config: CertSyncConfig, source: S) -> Self {
        let store = StateStore::new(config.state_path.clone());
        let deployer = Deployer::new(config.ssl_dir.clone());
        let patcher = ConfigPatcher::new(config.tls_config_path.clone());
        Self {
            config,
            source,
            observer: TracingObserver,
            store,
            deployer,
            patcher,
        }
    }
}

impl<S: CertSource, O: SyncObserver> Synchronizer<S, O> {
    /// Replace the observer receiving sync events
    pub fn with_observer<O2: SyncObserver>(self, observer: O2) -> Synchronizer<S, O2> {
        Synchronizer {
            config: self.config,
            source: self.source,
            observer,
            store: self.store,
            deployer: self.deployer,
            patcher: self.patcher,
        }
    }

    /// Run a full sync
    pub async fn run(&self, options: SyncOptions) -> Result<SyncReport> {
        let mut state = self.store.load();
        let plan = self.collect(&state, options.dry_run).await;

        let fragment = render_fragment(&self.config.cert_names, &self.config.cert_ref_dir);

        if options.dry_run {
            let config_changed = self.patcher.plan(&fragment)?.is_some();
            let outcomes = plan
                .entries
                .into_iter()
                .map(|(name, decision)| (name, decision.settle()))
                .collect();

            return Ok(SyncReport {
                outcomes,
                fragment,
                config_changed,
                state_committed: false,
                dry_run: true,
            });
        }

        if plan.fetched() == 0 {
            info!("no new or changed certificates to download");
        } else {
            info!(count = plan.fetched(), "deploying downloaded certificates");
        }

        // 1. certificate files
        let (outcomes, updates) = self.deploy_all(plan);

        // 2. proxy config
        let config_changed = self.patcher.apply(&fragment)?;
        self.observer
            .on_config_patched(self.patcher.path(), config_changed);

        // 3. state, only after everything it vouches for is on disk
        for (name, fingerprint) in updates {
            state.record(name, fingerprint);
        }
        self.store.commit(&state)?;
        self.observer
            .on_state_committed(self.store.path(), state.len());

        Ok(SyncReport {
            outcomes,
            fragment,
            config_changed,
            state_committed: true,
            dry_run: false,
        })
    }

    /// Check and download every configured certificate
    async fn collect(&self, state: &SyncState, dry_run: bool) -> FetchPlan {
        let entries = stream::iter(self.config.cert_names.iter())
            .map(move |name| async move {
                let decision = self
                    .evaluate(name, state.fingerprint(name), dry_run)
                    .await;
                (name.clone(), decision)
            })
            .buffered(self.config.network.max_concurrency.max(1))
            .collect()
            .await;

        FetchPlan { entries }
    }

    async fn evaluate(&self, name: &str, known: Option<&str>, dry_run: bool) -> Decision {
        self.observer
            .on_check_started(name, &self.source.describe(name));

        let check = match self.source.check_changed(name, known).await {
            Ok(check) => check,
            Err(e) => {
                self.observer.on_check_failed(name, &e);
                return Decision::CheckFailed(e.to_string());
            }
        };

        let fingerprint = match (check.changed, check.fingerprint) {
            (false, Some(fingerprint)) => {
                self.observer.on_unchanged(name, &fingerprint);
                return Decision::Unchanged;
            }
            (_, fingerprint) => fingerprint,
        };

        if dry_run {
            return Decision::Pending(fingerprint);
        }

        self.observer.on_fetch_started(name);
        match self.source.retrieve(name).await {
            Ok(material) => Decision::Fetched {
                material,
                fingerprint,
            },
            Err(e) => {
                self.observer.on_fetch_failed(name, &e);
                Decision::FetchFailed(e.to_string())
            }
        }
    }

    /// Write downloaded certificates; returns outcomes and the ETags safe to record
    fn deploy_all(&self, plan: FetchPlan) -> (Vec<(String, CertOutcome)>, Vec<(String, String)>) {
        let mut outcomes = Vec::with_capacity(plan.entries.len());
        let mut updates = Vec::new();

        for (name, decision) in plan.entries {
            let outcome = match decision {
                Decision::Fetched {
                    material,
                    fingerprint,
                } => match self.deployer.deploy(&name, &material) {
                    Ok(()) => {
                        self.observer.on_deployed(&name, fingerprint.as_deref());
                        if let Some(fp) = &fingerprint {
                            updates.push((name.clone(), fp.clone()));
                        }
                        CertOutcome::Deployed { fingerprint }
                    }
                    Err(e) => {
                        self.observer.on_write_failed(&name, &e);
                        CertOutcome::WriteFailed {
                            reason: e.to_string(),
                        }
                    }
                },
                other => other.settle(),
            };
            outcomes.push((name, outcome));
        }

        (outcomes, updates)
    }
}
