//! Store connection settings, read from the environment (and `.env`).

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Connection settings for [`ValkeyStore`](crate::store::ValkeyStore).
///
/// | Variable              | Default     |
/// |-----------------------|-------------|
/// | `VALKEY_HOST`         | `localhost` |
/// | `VALKEY_PORT`         | `6379`      |
/// | `VALKEY_PASSWORD`     | unset       |
/// | `VALKEY_TIMEOUT_SECS` | `5`         |
/// | `VALKEY_GEO_KEY`      | `points`    |
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub timeout: Duration,
    pub geo_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            timeout: Duration::from_secs(5),
            geo_key: "points".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("VALKEY_PORT") {
            Some(v) => v
                .parse()
                .with_context(|| format!("VALKEY_PORT is not a valid port: '{v}'"))?,
            None => defaults.port,
        };

        let timeout = match lookup("VALKEY_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("VALKEY_TIMEOUT_SECS is not a number: '{v}'"))?,
            ),
            None => defaults.timeout,
        };

        Ok(Self {
            host: lookup("VALKEY_HOST").unwrap_or(defaults.host),
            port,
            password: lookup("VALKEY_PASSWORD").filter(|p| !p.is_empty()),
            timeout,
            geo_key: lookup("VALKEY_GEO_KEY").unwrap_or(defaults.geo_key),
        })
    }
}
