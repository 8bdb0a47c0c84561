use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/process_query";
pub const DEFAULT_USER: &str = "user";
pub const ENDPOINT_ENV: &str = "CHATBOT_ENDPOINT";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Caller role sent with every query
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: default_endpoint(),
            user: default_user(),
            log_level: None,
        }
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Settle the effective config from its sources, weakest first: the file
    /// (defaults when it could not be read), then `CHATBOT_ENDPOINT`, then the
    /// `--endpoint` flag. The load error is handed back so the caller can log it
    /// once logging is up.
    pub fn resolve(
        loaded: Result<Self>,
        env_endpoint: Option<String>,
        cli_endpoint: Option<String>,
    ) -> (Self, Option<anyhow::Error>) {
        let (mut config, load_error) = match loaded {
            Ok(config) => (config, None),
            Err(e) => (Self::new(), Some(e)),
        };

        // An exported-but-empty variable doesn't count
        if let Some(endpoint) = env_endpoint.filter(|v| !v.trim().is_empty()) {
            config.endpoint = endpoint;
        }
        if let Some(endpoint) = cli_endpoint {
            config.endpoint = endpoint;
        }

        (config, load_error)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbot").join("config.json"))
    }
}
