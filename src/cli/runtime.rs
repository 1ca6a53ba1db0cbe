use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use genie_review_cli::Config;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOCAL_ENV_PATH: &str = "config/local.env";
const LOCAL_CONFIG_PATH: &str = "config/config.yaml";
const APP_DIR: &str = "genie-review";

/// Fills unset environment variables from `config/local.env`.
pub fn load_local_env_overrides() {
    let path = Path::new(LOCAL_ENV_PATH);
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            let applied = apply_env_lines(&contents);
            info!(path = %path.display(), applied, "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

fn apply_env_lines(contents: &str) -> usize {
    let mut applied = 0;
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = idx + 1, "invalid local.env entry; skipping");
            continue;
        };
        let key = key.trim();
        if key.is_empty() || env::var(key).is_ok() {
            continue;
        }
        env::set_var(key, unescape_value(value.trim()));
        applied += 1;
    }
    applied
}

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: Config::default(),
            path: config_path,
        })
    }
}

// ./config/config.yaml wins over <config_dir>/genie-review/config.yaml
fn default_config_path() -> Result<PathBuf> {
    let local_config = PathBuf::from(LOCAL_CONFIG_PATH);
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push(APP_DIR);
    path.push("config.yaml");
    Ok(path)
}

fn unescape_value(value: &str) -> String {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if !quoted {
        return value.to_string();
    }
    let inner = &value[1..value.len() - 1];
    if value.starts_with('\'') {
        return inner.to_string();
    }
    inner
        .replace("\\\"", "\"")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn unescapes_quoted_values() {
        assert_eq!(unescape_value("\"a\\nb\""), "a\nb");
        assert_eq!(unescape_value("'raw\\n'"), "raw\\n");
        assert_eq!(unescape_value("plain"), "plain");
        assert_eq!(unescape_value("\""), "\"");
    }

    #[test]
    #[serial]
    fn env_lines_do_not_override_existing_variables() {
        env::set_var("GENIE_TEST_PRESET", "kept");
        env::remove_var("GENIE_TEST_FRESH");

        let applied = apply_env_lines(
            "# comment\nGENIE_TEST_PRESET=replaced\nexport GENIE_TEST_FRESH=\"fresh value\"\nnot-an-entry\n",
        );

        assert_eq!(applied, 1);
        assert_eq!(env::var("GENIE_TEST_PRESET").unwrap(), "kept");
        assert_eq!(env::var("GENIE_TEST_FRESH").unwrap(), "fresh value");
        env::remove_var("GENIE_TEST_PRESET");
        env::remove_var("GENIE_TEST_FRESH");
    }

    #[test]
    fn loads_explicit_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 9100\ncontrol:\n  reset_delay: 5s").unwrap();
        let path = file.path().to_path_buf();

        let loaded = tokio_test::block_on(load_config(Some(&path))).unwrap();
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.server.port, 9100);
        assert_eq!(
            loaded.config.control.reset_delay,
            std::time::Duration::from_secs(5)
        );
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let loaded = tokio_test::block_on(load_config(Some(&path))).unwrap();
        assert_eq!(loaded.config.server.port, 8000);
    }
}
