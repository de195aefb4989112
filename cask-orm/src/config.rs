//! # Config Module
//!
//! Connection settings, read from the environment or from JSON.

use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::{Error, Result};

fn default_max_connections() -> u32 {
    5
}

/// Settings for one connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Name used in logs and by the [`ConnectionManager`](crate::ConnectionManager).
    #[serde(default)]
    pub name: Option<String>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), max_connections: default_max_connections(), name: None }
    }

    /// Reads `DATABASE_URL` and the optional `DATABASE_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL").map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("DATABASE_MAX_CONNECTIONS must be a number, got `{}`", raw)))?,
            Err(_) => default_max_connections(),
        };
        Ok(Self { url, max_connections, name: None })
    }
}

/// Several named connections and the one models use by default.
///
/// ```json
/// {
///   "default": "primary",
///   "connections": {
///     "primary": { "url": "sqlite::memory:" },
///     "reports": { "url": "postgres://localhost/reports", "max_connections": 2 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionsConfig {
    pub default: String,
    pub connections: HashMap<String, DatabaseConfig>,
}

impl ConnectionsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        if !config.connections.contains_key(&config.default) {
            return Err(Error::Config(format!("default connection `{}` is not configured", config.default)));
        }
        Ok(config)
    }
}
