use std::{env, net::SocketAddr};

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_BIND_PORT: u16 = 3000;
pub const DEFAULT_SWAPI_BASE_URL: &str = "https://swapi.dev/api/";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub swapi_base_url: Url,
    pub api_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("SWAPI_BASE_URL must be an absolute http(s) URL")]
    InvalidBaseUrl,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_port = lookup("BIND_PORT")
            .map(|value| {
                value
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort)
            })
            .transpose()?
            .unwrap_or(DEFAULT_BIND_PORT);
        let swapi_base_url = parse_base_url(
            lookup("SWAPI_BASE_URL")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .as_deref()
                .unwrap_or(DEFAULT_SWAPI_BASE_URL),
        )?;
        let api_key = lookup("MCP_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let config = Self {
            bind_addr,
            bind_port,
            swapi_base_url,
            api_key,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    // Relative joins drop the last path segment unless it ends with a slash.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    let url = Url::parse(&normalized).map_err(|_| ConfigError::InvalidBaseUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl);
    }

    Ok(url)
}
