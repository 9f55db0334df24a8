use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::client::{RecommendClient, DEFAULT_BASE_URL};

pub const ENDPOINT_ENV: &str = "CAREBOT_ENDPOINT";

pub const DEFAULT_GREETING: &str =
    "Welcome! I'm here to help you find the best hospitals. Ask me for recommendations!";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Base URL of the recommendation service, without the `/recommend` path
    pub endpoint: Option<String>,
    pub greeting: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Store an endpoint for [`Config::save`]; a blank value clears it.
    pub fn set_endpoint(&mut self, url: &str) {
        let url = url.trim();
        self.endpoint = (!url.is_empty()).then(|| url.to_string());
    }

    /// Resolve the base URL: explicit override, then `CAREBOT_ENDPOINT`, then
    /// the config file, then the local default.
    pub fn resolve_endpoint(&self, cli_override: Option<&str>) -> String {
        let from_env = std::env::var(ENDPOINT_ENV).ok();
        self.resolve_endpoint_with(cli_override, from_env.as_deref())
    }

    fn resolve_endpoint_with(&self, cli_override: Option<&str>, from_env: Option<&str>) -> String {
        [cli_override, from_env, self.endpoint.as_deref()]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    /// Build the HTTP client this configuration describes.
    pub fn client(&self, cli_override: Option<&str>) -> Result<RecommendClient> {
        let base_url = self.resolve_endpoint(cli_override);
        match self.request_timeout() {
            Some(timeout) => RecommendClient::with_timeout(&base_url, timeout),
            None => Ok(RecommendClient::new(&base_url)),
        }
    }

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(DEFAULT_GREETING)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("carebot"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
