use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::web_apis::{DEFAULT_CAT_API_URL, DEFAULT_URBAN_API_URL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(alias = "token")]
    pub discord_token: String,
    #[serde(default)]
    pub application_id: Option<u64>,
    #[serde(default)]
    pub discord_public_key: Option<String>,
    /// Register commands in this guild only instead of globally
    #[serde(default)]
    pub guild_id: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_cat_api_url")]
    pub cat_api_url: String,
    #[serde(default = "default_urban_api_url")]
    pub urban_api_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_cat_api_url() -> String {
    DEFAULT_CAT_API_URL.to_string()
}

fn default_urban_api_url() -> String {
    DEFAULT_URBAN_API_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_handler_timeout_secs() -> u64 {
    30
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Loads from the JSON file named by `GUIDEBOT_CONFIG`, or from the environment.
    pub fn load() -> Result<Self> {
        match env::var("GUIDEBOT_CONFIG") {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow!("DISCORD_TOKEN environment variable not set"))?,
            application_id: parse_var("DISCORD_APPLICATION_ID")?,
            discord_public_key: env::var("DISCORD_PUBLIC_KEY").ok(),
            guild_id: parse_var("DISCORD_GUILD_ID")?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            http_port: parse_var("HTTP_PORT")?.unwrap_or_else(default_http_port),
            cat_api_url: env::var("CAT_API_URL").unwrap_or_else(|_| default_cat_api_url()),
            urban_api_url: env::var("URBAN_API_URL").unwrap_or_else(|_| default_urban_api_url()),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS")?
                .unwrap_or_else(default_http_timeout_secs),
            handler_timeout_secs: parse_var("HANDLER_TIMEOUT_SECS")?
                .unwrap_or_else(default_handler_timeout_secs),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}
