//! Config command

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use ohmycert_core::ConfigLoader;

use super::load_config;
use crate::cli::{ConfigCommands, ConfigInitArgs};
use crate::output;

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Init(args) => init(args),
        ConfigCommands::Validate => validate(config_path),
        ConfigCommands::Show => show(config_path),
    }
}

fn init(args: ConfigInitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(anyhow!(
            "File {} already exists. Use --force to overwrite.",
            args.output
        ));
    }

    let content = ConfigLoader::starter_template().context("Failed to load starter config")?;
    std::fs::write(&args.output, content)
        .with_context(|| format!("Failed to write {}", args.output))?;

    output::success(&format!("Created {}", args.output));
    output::info(
        "Edit cert-names, base-url, ssl-dir and tls-config-path, then run `ohmycert sync`",
    );
    Ok(())
}

fn validate(config_path: Option<&Utf8Path>) -> Result<()> {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            output::error("Configuration is invalid");
            return Err(e);
        }
    };

    output::success("Configuration is valid");
    output::kv("Certificates", &config.cert_names.len().to_string());
    output::kv("Base URL", &config.base_url);
    Ok(())
}

fn show(config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", serde_yaml_ng::to_string(&config)?);
    Ok(())
}
