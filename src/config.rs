//! Environment-driven configuration

use std::time::Duration;
use thiserror::Error;

const DEFAULT_CHAT_URL: &str = "http://localhost:3000/api/chat";
const DEFAULT_ORCHESTRATOR_URL: &str = "http://orchestrator:8003";
const DEFAULT_RELAY_PORT: u16 = 3000;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings for the chat client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay endpoint receiving `{"message": ...}`
    pub endpoint: String,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHAT_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Reads `AGENT_CHAT_URL` and `AGENT_CONNECT_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Fails when the timeout is set but not a whole number of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secs = parse_var(&lookup, "AGENT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;
        Ok(Self {
            endpoint: lookup("AGENT_CHAT_URL").unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            connect_timeout: Duration::from_secs(secs),
        })
    }
}

/// Settings for the relay server
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    /// Orchestrator base URL; requests go to `{upstream}/chat`
    pub upstream: String,
    pub connect_timeout: Duration,
}

impl RelayConfig {
    /// Reads `AGENT_RELAY_PORT`, `ORCHESTRATOR_URL` and
    /// `AGENT_CONNECT_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Fails when a numeric variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_var(&lookup, "AGENT_RELAY_PORT", DEFAULT_RELAY_PORT)?,
            upstream: lookup("ORCHESTRATOR_URL")
                .unwrap_or_else(|| DEFAULT_ORCHESTRATOR_URL.to_string()),
            connect_timeout: Duration::from_secs(parse_var(
                &lookup,
                "AGENT_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?),
        })
    }

    /// Full URL of the upstream chat endpoint
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.upstream.trim_end_matches('/'))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
