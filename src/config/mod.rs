//! Service configuration (env > file > builder defaults).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::error::{Result, SkaldError};
use crate::retry::RetryPolicy;

const ENV_REQUIRED: [&str; 3] = ["ENDPOINT", "API_KEY", "MODEL"];

/// Configuration for the streaming service and the bundled client.
#[derive(Debug, Clone, Builder, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the model endpoint.
    pub endpoint: String,
    /// API key for the endpoint.
    pub api_key: String,
    /// Model (or deployment) name.
    pub model: String,
    /// Optional API version tag.
    pub api_version: Option<String>,
    /// Maximum tokens per response.
    #[builder(default = 2000)]
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[builder(default = 0.7)]
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Hard timeout for non-streaming requests, in seconds.
    #[builder(default = 30)]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries after the initial attempt.
    #[builder(default = 3)]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f64 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl ServiceConfig {
    /// Load from environment variables (reads `.env` first if present).
    ///
    /// Requires `ENDPOINT`, `API_KEY` and `MODEL`; reports every missing
    /// one at once. Optional overrides: `API_VERSION`, `AI_MAX_TOKENS`,
    /// `AI_TEMPERATURE`, `AI_REQUEST_TIMEOUT`, `AI_MAX_RETRIES`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| {
            SkaldError::Configuration(format!(
                "invalid config file {}: {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Load from the user config file when one exists, else from the
    /// environment.
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    /// Location of the user config file, when a home directory exists.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "skald")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let missing: Vec<&str> = ENV_REQUIRED
            .iter()
            .copied()
            .filter(|name| lookup(name).map_or(true, |v| v.is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(SkaldError::Configuration(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            endpoint: lookup("ENDPOINT").unwrap_or_default(),
            api_key: lookup("API_KEY").unwrap_or_default(),
            model: lookup("MODEL").unwrap_or_default(),
            api_version: lookup("API_VERSION"),
            max_tokens: parse_or(&lookup, "AI_MAX_TOKENS", 2000)?,
            temperature: parse_or(&lookup, "AI_TEMPERATURE", 0.7)?,
            request_timeout_secs: parse_or(&lookup, "AI_REQUEST_TIMEOUT", 30)?,
            max_retries: parse_or(&lookup, "AI_MAX_RETRIES", 3)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| SkaldError::Configuration(format!("invalid value for {name}: {raw}"))),
        None => Ok(default),
    }
}
