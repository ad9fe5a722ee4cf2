use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{PopoteError, PopoteResult};

/// Environment variable overriding the configured API base URL.
/// Lets a device on the LAN point at the host machine without editing the file.
pub const API_URL_ENV: &str = "POPOTE_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the meal-planning backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout applied to every call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory holding the persisted session record.
    /// Defaults to the platform data directory when absent.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            storage_dir: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn resolve_config_path() -> PopoteResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("popote.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("popote.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(PopoteError::Config(
        "popote.toml not found next to executable or in working directory".into(),
    ))
}

/// Load the config file, falling back to defaults when it does not exist.
/// `POPOTE_API_URL` overrides the base URL either way.
pub fn load_config() -> PopoteResult<ClientConfig> {
    let mut config = match resolve_config_path() {
        Ok(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config: ClientConfig = toml::from_str(&content)?;
            tracing::info!(path = %path.display(), base_url = %config.base_url, "config loaded");
            config
        }
        Err(_) => {
            tracing::debug!("no config file, using defaults");
            ClientConfig::default()
        }
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.is_empty() {
            tracing::info!(base_url = %url, "base URL overridden from environment");
            config.base_url = url;
        }
    }

    Ok(config)
}

pub fn save_config(config: &ClientConfig) -> PopoteResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
