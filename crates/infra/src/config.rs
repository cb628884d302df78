//! Process configuration read from the environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `DATABASE_URL` | Postgres URL; unset means in-memory storage | none |
//! | `REDIS_URL` | event bus endpoint | none |
//! | `USER_EVENTS_TOPIC` | pub/sub channel for user events | none |
//! | `USER_EVENTS_ENABLED` | `true/false` (also `1/0`, `yes/no`, `on/off`) | `true` |
//! | `BIND_ADDR` | HTTP listen address | `0.0.0.0:8080` |
//!
//! A missing endpoint or topic leaves the publisher unconfigured whatever the
//! enable flag says.

use std::net::SocketAddr;

use thiserror::Error;

use userhub_events::PublisherConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?} is not a socket address")]
    InvalidAddr { var: &'static str, value: String },

    #[error("invalid {var}: {value:?} is not a boolean")]
    InvalidFlag { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub events: PublisherConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (blank values count as unset).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_value = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_value
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidAddr {
                var: "BIND_ADDR",
                value: bind_value.clone(),
            })?;

        let enabled = match get("USER_EVENTS_ENABLED") {
            Some(v) => parse_flag("USER_EVENTS_ENABLED", &v)?,
            None => true,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            bind_addr,
            events: PublisherConfig {
                endpoint: get("REDIS_URL"),
                topic: get("USER_EVENTS_TOPIC"),
                enabled,
            },
        })
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
