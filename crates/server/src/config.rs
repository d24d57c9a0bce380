//! Process configuration, read once at startup.

use std::{env, path::PathBuf, time::Duration};

use secrecy::SecretString;
use services::services::claude_api::{
    ClaudeConfig, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://trucktetris.db";
pub const DEFAULT_DOCUMENT_DIR: &str = "./documents";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_CLAUDE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub document_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_tokens: u32,
    /// `None` when no API key is configured; optimize and regenerate then
    /// answer with a configuration error.
    pub claude: Option<ClaudeConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let claude = get("ANTHROPIC_API_KEY")
            .map(|api_key| -> Result<ClaudeConfig, ConfigError> {
                Ok(ClaudeConfig {
                    api_key: SecretString::from(api_key),
                    model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                    base_url: get("ANTHROPIC_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                    timeout: Duration::from_secs(parse_or(
                        &get,
                        "ANTHROPIC_TIMEOUT_SECS",
                        DEFAULT_CLAUDE_TIMEOUT_SECS,
                    )?),
                })
            })
            .transpose()?;

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            document_dir: get("DOCUMENT_DIR")
                .unwrap_or_else(|| DEFAULT_DOCUMENT_DIR.to_string())
                .into(),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_tokens: parse_or(&get, "ANTHROPIC_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            claude,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
