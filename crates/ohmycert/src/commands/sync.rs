//! Sync command

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use ohmycert_core::{CertOutcome, HttpCertSource, SyncOptions, SyncReport, Synchronizer};

use super::load_config;
use crate::cli::SyncArgs;
use crate::output;

pub async fn run(args: SyncArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let source = HttpCertSource::new(&config).context("Failed to create HTTP client")?;

    let report = Synchronizer::new(config, source)
        .run(SyncOptions {
            dry_run: args.dry_run,
        })
        .await
        .context("Sync aborted")?;

    print_report(&report);

    if args.strict && report.has_failures() {
        return Err(anyhow!(
            "{} certificate(s) could not be synced: {}",
            report.failures().len(),
            report.failures().join(", ")
        ));
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.dry_run {
        output::header("Dry run");
    } else {
        output::header("Sync summary");
    }

    for (name, outcome) in &report.outcomes {
        let detail = match outcome {
            CertOutcome::CheckFailed { reason }
            | CertOutcome::FetchFailed { reason }
            | CertOutcome::WriteFailed { reason } => format!("{} ({})", outcome.label(), reason),
            CertOutcome::Deployed {
                fingerprint: Some(etag),
            }
            | CertOutcome::Pending {
                fingerprint: Some(etag),
            } => format!("{} [{}]", outcome.label(), etag),
            _ => outcome.label().to_string(),
        };
        output::kv(name, &detail);
    }

    if report.dry_run {
        if report.config_changed {
            output::info("Proxy config would be updated with:");
            print!("{}", report.fragment);
        } else {
            output::info("Proxy config is already up to date");
        }
        return;
    }

    let deployed = report.deployed().len();
    if deployed == 0 {
        output::info("No new or changed certificates");
    } else {
        output::success(&format!("Deployed {} certificate(s)", deployed));
    }
    if report.config_changed {
        output::success("Proxy config updated");
    }
    if report.has_failures() {
        output::warning(&format!(
            "{} certificate(s) skipped, will retry on the next run",
            report.failures().len()
        ));
    }
}
