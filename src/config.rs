// src/config.rs
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    pub request_timeout: Duration,
    pub public_dir: PathBuf,
    pub admin_key: Option<String>,
}

// Keep the key out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("bind_addr", &self.bind_addr)
            .field("session_ttl", &self.session_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("public_dir", &self.public_dir)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: raw,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        Ok(Self {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            bind_addr,
            session_ttl: secs(get("SESSION_TTL_SECS"), "SESSION_TTL_SECS", 1800)?,
            request_timeout: secs(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 60)?,
            public_dir: get("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            admin_key: get("ADMIN_KEY"),
        })
    }
}

fn secs(raw: Option<String>, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(value) => match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
