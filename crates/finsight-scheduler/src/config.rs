use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "console.yaml";
pub const ENV_BASE_URL: &str = "FINSIGHT_BASE_URL";
pub const ENV_TOKEN: &str = "FINSIGHT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsoleConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Session token issued by the upstream auth context.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            bearer_token: None,
        }
    }
}

impl ConsoleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then `<config_root>/console.yaml`, then defaults.
    pub fn resolve(explicit: Option<&Path>, config_root: &Path) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let path = default_config_path(config_root);
                if path.exists() {
                    Self::load(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "no console config, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.bearer_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.base_url.trim().is_empty(), "base_url must not be empty");
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be positive"
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn default_config_path(config_root: &Path) -> PathBuf {
    config_root.join(CONFIG_FILE_NAME)
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_settle_delay_ms() -> u64 {
    200
}

fn default_request_timeout_secs() -> u64 {
    30
}
