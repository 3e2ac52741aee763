//! Runtime configuration.
//!
//! Values come from environment variables (a `.env` file is loaded first by
//! the binaries):
//! - `HOST` / `PORT` - listen address (default `0.0.0.0:8000`)
//! - `PUBLIC_URL` - base URL advertised in the agent card (default `http://localhost:<PORT>`)
//! - `MODEL` - model id passed to the LLM provider
//! - `API_KEY` (or `OPENROUTER_API_KEY`) - provider API key
//! - `LLM_API_URL` - OpenAI-compatible chat completions endpoint
//! - `LLM_TEMPERATURE` - sampling temperature (unset = provider default)
//! - `LOG_DIR` - directory for `adapter.log` (default `logs`)
//! - `CLARIFY_TIMEOUT_SECS` - per-task clarification deadline (unset = none)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::llm::OPENROUTER_API_URL;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub llm_api_url: String,
    pub temperature: Option<f64>,
    pub log_dir: PathBuf,
    pub clarify_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: "http://localhost:8000".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            llm_api_url: OPENROUTER_API_URL.to_string(),
            temperature: None,
            log_dir: PathBuf::from("logs"),
            clarify_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                name: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.port,
        };

        let clarify_timeout = match var("CLARIFY_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    name: "CLARIFY_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let temperature = match var("LLM_TEMPERATURE") {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                name: "LLM_TEMPERATURE",
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            public_url: var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            model: var("MODEL").unwrap_or(defaults.model),
            api_key: var("API_KEY").or_else(|| var("OPENROUTER_API_KEY")),
            llm_api_url: var("LLM_API_URL").unwrap_or(defaults.llm_api_url),
            temperature,
            log_dir: var("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            clarify_timeout,
        })
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
