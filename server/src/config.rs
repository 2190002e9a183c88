//! Server configuration module.
//!
//! Parses configuration from environment variables for the Listkeeper server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 4567 | HTTP server port |
//! | `LISTKEEPER_SESSION_TTL_SECS` | No | 86400 | Idle time before a session expires |
//! | `LISTKEEPER_MAX_SESSIONS` | No | 10000 | Maximum number of live sessions |
//! | `LISTKEEPER_SECURE_COOKIE` | No | false | Mark the session cookie `Secure` |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::session::{SessionStoreConfig, DEFAULT_MAX_CAPACITY, DEFAULT_TTL_SECS};

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 4567;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Idle time after which a session and its lists are dropped.
    pub session_ttl: Duration,

    /// Maximum number of sessions held at once.
    pub max_sessions: usize,

    /// When true, the session cookie carries the `Secure` attribute.
    pub secure_cookie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_sessions: DEFAULT_MAX_CAPACITY,
            secure_cookie: false,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is not valid unicode, does not
    /// parse as a number, or is zero where a positive value is required.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use listkeeper_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port()?;
        let ttl_secs = parse_number_env("LISTKEEPER_SESSION_TTL_SECS", DEFAULT_TTL_SECS)?;
        let max_sessions = parse_number_env("LISTKEEPER_MAX_SESSIONS", DEFAULT_MAX_CAPACITY)?;
        let secure_cookie = parse_bool_env("LISTKEEPER_SECURE_COOKIE");

        let config = Self {
            port,
            session_ttl: Duration::from_secs(ttl_secs),
            max_sessions,
            secure_cookie,
        };

        config.validate()?;

        Ok(config)
    }

    /// Session store settings derived from this configuration.
    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig::new(self.max_sessions, self.session_ttl)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "LISTKEEPER_SESSION_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "LISTKEEPER_MAX_SESSIONS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.trim().parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse an unsigned numeric environment variable, falling back to
/// `default` when unset or empty.
fn parse_number_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = match env::var(name) {
        Ok(s) if !s.trim().is_empty() => s,
        Ok(_) | Err(env::VarError::NotPresent) => return Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            return Err(ConfigError::InvalidFormat {
                var: name.to_string(),
                message: "contains invalid unicode".to_string(),
            })
        }
    };

    raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidFormat {
        var: name.to_string(),
        message: format!("expected a non-negative integer, got '{}': {err}", raw.trim()),
    })
}
