//! Application configuration
//!
//! Loaded from YAML by the CLI, then overlaid with environment variables for
//! secrets and endpoints.

use std::env;
use std::time::Duration;

use action_control::{ControlSettings, ControlTheme, DEFAULT_REVIEW_ENDPOINT, RESET_DELAY};
use element_watcher::DEFAULT_MOUNT_SELECTORS;
use gitlab_adapter::{GitLabConfig, DEFAULT_GITLAB_URL};
use review_engine::{OpenAiConfig, DEFAULT_OPENAI_BASE, DEFAULT_REVIEW_MODEL};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";
pub const GITLAB_BASE_URL_ENV: &str = "GITLAB_BASE_URL";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const REVIEW_ENDPOINT_ENV: &str = "GENIE_REVIEW_ENDPOINT";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gitlab: GitLabSettings,
    pub openai: OpenAiSettings,
    pub control: ControlConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GitLabSettings {
    pub base_url: String,
    /// Personal access token; usually supplied through `GITLAB_TOKEN`.
    pub token: Option<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Settings for the page-side control driven by `genie inject`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ControlConfig {
    pub endpoint: String,
    #[serde(with = "humantime_serde")]
    pub reset_delay: Duration,
    /// Mount point selectors, highest priority first.
    pub selectors: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for GitLabSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GITLAB_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_REVIEW_MODEL.to_string(),
            api_base: DEFAULT_OPENAI_BASE.to_string(),
            temperature: 0.0,
            max_tokens: 1500,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REVIEW_ENDPOINT.to_string(),
            reset_delay: RESET_DELAY,
            selectors: DEFAULT_MOUNT_SELECTORS
                .iter()
                .map(|selector| selector.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Overlays non-empty environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = env_value(GITLAB_TOKEN_ENV) {
            self.gitlab.token = Some(token);
        }
        if let Some(base_url) = env_value(GITLAB_BASE_URL_ENV) {
            self.gitlab.base_url = base_url;
        }
        if let Some(key) = env_value(OPENAI_API_KEY_ENV) {
            self.openai.api_key = Some(key);
        }
        if let Some(api_base) = env_value(OPENAI_API_BASE_ENV) {
            self.openai.api_base = api_base;
        }
        if let Some(endpoint) = env_value(REVIEW_ENDPOINT_ENV) {
            self.control.endpoint = endpoint;
        }
    }

    /// Copy suitable for printing: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.gitlab.token = copy.gitlab.token.as_deref().map(mask);
        copy.openai.api_key = copy.openai.api_key.as_deref().map(mask);
        copy
    }
}

impl GitLabSettings {
    pub fn client_config(&self) -> GitLabConfig {
        GitLabConfig {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            timeout: self.timeout,
        }
    }
}

impl OpenAiSettings {
    pub fn reviewer_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            api_base: self.api_base.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        }
    }
}

impl ControlConfig {
    pub fn control_settings(&self) -> ControlSettings {
        ControlSettings {
            reset_delay: self.reset_delay,
            theme: ControlTheme::default(),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    debug!(key, "Configuration overridden from environment");
    Some(trimmed.to_string())
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

/// `Duration` fields as humantime strings (`3s`, `1m 30s`).
mod humantime_serde {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_the_page_control() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.control.endpoint, "http://127.0.0.1:8000/review");
        assert_eq!(config.control.reset_delay, Duration::from_secs(3));
        assert_eq!(
            config.control.selectors,
            vec![".gl-button-group", ".mr-state-container + div"]
        );
        assert_eq!(config.openai.model, "gpt-4.1-nano");
    }

    #[test]
    fn partial_yaml_keeps_defaults_and_parses_durations() {
        let config: Config = serde_yaml::from_str(
            "control:\n  reset_delay: 1m 30s\nopenai:\n  max_tokens: 800\n",
        )
        .unwrap();
        assert_eq!(config.control.reset_delay, Duration::from_secs(90));
        assert_eq!(config.control.endpoint, DEFAULT_REVIEW_ENDPOINT);
        assert_eq!(config.openai.max_tokens, 800);
        assert_eq!(config.gitlab.timeout, Duration::from_secs(30));

        let encoded = serde_yaml::to_string(&config).unwrap();
        assert!(encoded.contains("reset_delay: 1m 30s"));
    }

    #[test]
    fn rejects_malformed_duration() {
        let parsed: Result<Config, _> = serde_yaml::from_str("control:\n  reset_delay: soon\n");
        assert!(parsed.is_err());
    }

    #[test]
    #[serial]
    fn environment_overrides_file_values() {
        env::set_var(GITLAB_TOKEN_ENV, "glpat-from-env");
        env::set_var(OPENAI_API_KEY_ENV, "  ");
        env::set_var(REVIEW_ENDPOINT_ENV, "http://review.internal/review");

        let mut config = Config::default();
        config.openai.api_key = Some("from-file".to_string());
        config.apply_env_overrides();

        env::remove_var(GITLAB_TOKEN_ENV);
        env::remove_var(OPENAI_API_KEY_ENV);
        env::remove_var(REVIEW_ENDPOINT_ENV);

        assert_eq!(config.gitlab.token.as_deref(), Some("glpat-from-env"));
        assert_eq!(config.openai.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.control.endpoint, "http://review.internal/review");
    }

    #[test]
    fn redaction_masks_secrets() {
        let mut config = Config::default();
        config.gitlab.token = Some("glpat-secret".to_string());
        let shown = config.redacted();
        assert_eq!(shown.gitlab.token.as_deref(), Some("glpa****"));
        assert_eq!(shown.openai.api_key, None);
    }
}
