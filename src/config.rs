//! Process configuration read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::translate::chat::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub provider_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_op_timeout: Duration,
    pub l1_capacity: usize,
    pub l2_path: Option<PathBuf>,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("LINGOMIX_API_KEY")
            .or_else(|| get("DASHSCOPE_API_KEY"))
            .ok_or(ConfigError::Missing("LINGOMIX_API_KEY"))?;

        Ok(Self {
            api_key,
            base_url: get("LINGOMIX_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("LINGOMIX_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(&get, "LINGOMIX_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            provider_timeout: Duration::from_secs(parse_or(
                &get,
                "LINGOMIX_PROVIDER_TIMEOUT_SECS",
                30,
            )?),
            cache_ttl: Duration::from_secs(parse_or(&get, "LINGOMIX_CACHE_TTL_SECS", 3600)?),
            cache_op_timeout: Duration::from_millis(parse_or(
                &get,
                "LINGOMIX_CACHE_OP_TIMEOUT_MS",
                500,
            )?),
            l1_capacity: parse_or(&get, "LINGOMIX_L1_CAPACITY", 4096)?,
            l2_path: get("LINGOMIX_L2_PATH").map(PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
