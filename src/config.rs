//! Runtime configuration, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `ENVIRONMENT` | `development` |
//! | `JWT_SECRET` | generated placeholder in development, required elsewhere |
//! | `ACCESS_TOKEN_EXPIRE_MINUTES` | `30` |
//! | `LOCK_TIMEOUT_MS` | `5000` |
//! | `CACHE_TTL_SECS` | `300` |
//! | `CHANNEL_BUFFER` | `32` |
//! | `ON_USER_DELETE` | `cascade` |
//! | `ON_PRODUCT_DELETE` | `cascade` |
//! | `PASSWORD_HASH_MEMORY_KIB` | `19456` |
//! | `PASSWORD_HASH_ITERATIONS` | `2` |

use crate::db::{OnDelete, StoreOptions};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in {1} environment")]
    Missing(&'static str, String),
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub lock_timeout: Duration,
    pub cache_ttl: Duration,
    /// Queue size of the cache and event actors.
    pub channel_buffer: usize,
    pub on_user_delete: OnDelete,
    pub on_product_delete: OnDelete,
    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
}

const DEV_JWT_SECRET: &str = "dev-JWT_SECRET-not-for-production";

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_expire_minutes: 30,
            lock_timeout: Duration::from_millis(5000),
            cache_ttl: Duration::from_secs(300),
            channel_buffer: 32,
            on_user_delete: OnDelete::Cascade,
            on_product_delete: OnDelete::Cascade,
            password_hash_memory_kib: 19456,
            password_hash_iterations: 2,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let environment = lookup("ENVIRONMENT")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.environment);

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if environment == "development" => defaults.jwt_secret,
            None => return Err(ConfigError::Missing("JWT_SECRET", environment)),
        };

        let config = Self {
            jwt_secret,
            access_token_expire_minutes: parse(
                &lookup,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                defaults.access_token_expire_minutes,
            )?,
            lock_timeout: Duration::from_millis(parse(
                &lookup,
                "LOCK_TIMEOUT_MS",
                defaults.lock_timeout.as_millis() as u64,
            )?),
            cache_ttl: Duration::from_secs(parse(
                &lookup,
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            channel_buffer: parse(&lookup, "CHANNEL_BUFFER", defaults.channel_buffer)?.max(1),
            on_user_delete: parse(&lookup, "ON_USER_DELETE", defaults.on_user_delete)?,
            on_product_delete: parse(&lookup, "ON_PRODUCT_DELETE", defaults.on_product_delete)?,
            password_hash_memory_kib: parse(
                &lookup,
                "PASSWORD_HASH_MEMORY_KIB",
                defaults.password_hash_memory_kib,
            )?,
            password_hash_iterations: parse(
                &lookup,
                "PASSWORD_HASH_ITERATIONS",
                defaults.password_hash_iterations,
            )?,
            environment,
        };
        config.access_token_ttl()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Lifetime of issued access tokens. Must be positive and within `chrono`'s range.
    pub fn access_token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::try_minutes(self.access_token_expire_minutes)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| ConfigError::Invalid {
                name: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: self.access_token_expire_minutes.to_string(),
                reason: "must be a positive number of minutes".to_string(),
            })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            lock_timeout: self.lock_timeout,
            on_user_delete: self.on_user_delete,
            on_product_delete: self.on_product_delete,
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).filter(|s| !s.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
