//! Status command

use anyhow::Result;
use camino::Utf8Path;
use ohmycert_core::deploy::Deployer;
use ohmycert_core::{CertSyncConfig, StateStore, SyncState};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::load_config;
use crate::cli::StatusArgs;
use crate::output;

#[derive(Tabled, Serialize)]
struct CertStatusRow {
    name: String,
    etag: String,
    #[tabled(rename = "files deployed")]
    deployed: bool,
}

pub fn run(args: StatusArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = StateStore::new(config.state_path.clone()).load();
    let rows = collect_rows(&config, &state);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    output::kv("State file", config.state_path.as_str());
    output::kv("Deploy directory", config.ssl_dir.as_str());
    output::kv("Proxy config", config.tls_config_path.as_str());

    let mut table = Table::new(&rows);
    table.with(Style::sharp());
    println!("{}", table);

    let never_synced = rows.iter().filter(|row| row.etag == "-").count();
    if never_synced > 0 {
        output::warning(&format!(
            "{} certificate(s) have not been synced yet",
            never_synced
        ));
    }

    Ok(())
}

fn collect_rows(config: &CertSyncConfig, state: &SyncState) -> Vec<CertStatusRow> {
    let deployer = Deployer::new(config.ssl_dir.clone());
    config
        .cert_names
        .iter()
        .map(|name| CertStatusRow {
            name: name.clone(),
            etag: state.fingerprint(name).unwrap_or("-").to_string(),
            deployed: deployer.is_deployed(name),
        })
        .collect()
}
