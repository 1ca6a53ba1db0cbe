use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use genie_review_cli::Config;
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (secrets masked)
    Show,

    /// Print one value by dotted key, e.g. `control.reset_delay`
    Get { key: String },

    /// Store one value by dotted key in the configuration file
    Set { key: String, value: String },

    /// Check that the configuration file parses
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            println!("Effective configuration ({}):", path.display());
            println!("{}", serde_yaml::to_string(&ctx.config().redacted())?);
        }
        ConfigAction::Get { key } => {
            let document = serde_json::to_value(ctx.config().redacted())?;
            let Some(value) = document.pointer(&json_pointer(&key)?) else {
                bail!("{} not found in configuration", key);
            };
            println!("{}", serde_yaml::to_string(value)?);
        }
        ConfigAction::Set { key, value } => {
            let config = read_config_file(path).await?;
            let mut document = serde_json::to_value(&config)?;
            let slot = document
                .pointer_mut(&json_pointer(&key)?)
                .with_context(|| format!("{} is not a configuration key", key))?;
            *slot = parse_cli_value(&value, slot);
            let updated: Config = serde_json::from_value(document)
                .with_context(|| format!("invalid value for {}", key))?;
            write_config_file(path, &updated).await?;
            info!(%key, "Updated configuration key");
            println!("Saved configuration to {}", path.display());
        }
        ConfigAction::Validate => {
            if fs::try_exists(path).await? {
                read_config_file(path).await?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

async fn read_config_file(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await? {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn write_config_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, serde_yaml::to_string(config)?)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

/// `control.reset_delay` becomes `/control/reset_delay`.
fn json_pointer(key: &str) -> Result<String> {
    let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments
        .iter()
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect())
}

// Strings stay strings unless the current value is not a string.
fn parse_cli_value(raw: &str, current: &JsonValue) -> JsonValue {
    if current.is_string() {
        return JsonValue::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}
