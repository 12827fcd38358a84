//! Wishlist service configuration.
//!
//! Configuration is loaded from environment variables. The identity provider
//! settings are required; a process that cannot name its key set endpoint
//! refuses to start rather than rejecting every request at runtime.

use crate::auth::jwks::cognito_jwks_url;
use common::jwt::MAX_CLOCK_SKEW;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default timeout for a single JWKS fetch, in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS fetch timeout, in seconds.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Default minimum age of the cached key set before an unknown `kid` may
/// trigger a re-fetch, in seconds.
pub const DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Default leeway applied to `exp`/`nbf`, in seconds.
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: u64 = 0;

/// Default graceful shutdown drain period, in seconds.
pub const DEFAULT_SHUTDOWN_DRAIN_SECONDS: u64 = 10;

/// Wishlist service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Identity provider region (e.g., "us-east-1").
    pub aws_region: String,

    /// Identity provider user pool identifier (e.g., "us-east-1_AbCdEf123").
    pub user_pool_id: String,

    /// URL of the provider's published key set.
    ///
    /// Derived from region and pool unless `COGNITO_JWKS_URL` overrides it.
    pub jwks_url: String,

    /// Timeout for a single JWKS fetch, in seconds.
    pub jwks_fetch_timeout_seconds: u64,

    /// Minimum age of the cached key set before an unknown `kid` triggers
    /// a re-fetch. Zero re-fetches on every miss.
    pub jwks_refresh_cooldown_seconds: u64,

    /// Leeway applied to `exp` and `nbf`, in seconds.
    pub jwt_clock_skew_seconds: u64,

    /// Seconds to keep draining connections after a shutdown signal.
    pub shutdown_drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid identity provider configuration: {0}")]
    InvalidIdentityProvider(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid shutdown configuration: {0}")]
    InvalidShutdown(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let aws_region = required(vars, "AWS_REGION")?;
        if !aws_region
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::InvalidIdentityProvider(format!(
                "AWS_REGION contains invalid characters: '{}'",
                aws_region
            )));
        }

        let user_pool_id = required(vars, "COGNITO_USER_POOL_ID")?;
        if !user_pool_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidIdentityProvider(format!(
                "COGNITO_USER_POOL_ID contains invalid characters: '{}'",
                user_pool_id
            )));
        }

        let jwks_url = match vars.get("COGNITO_JWKS_URL") {
            Some(url) => {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::InvalidJwks(format!(
                        "COGNITO_JWKS_URL must be an http(s) URL, got '{}'",
                        url
                    )));
                }
                url.clone()
            }
            None => cognito_jwks_url(&aws_region, &user_pool_id),
        };

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_fetch_timeout_seconds = parse_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
            ConfigError::InvalidJwks,
        )?;
        if jwks_fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidJwks(
                "JWKS_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }
        if jwks_fetch_timeout_seconds > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidJwks(format!(
                "JWKS_FETCH_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_FETCH_TIMEOUT_SECONDS, jwks_fetch_timeout_seconds
            )));
        }

        let jwks_refresh_cooldown_seconds = parse_seconds(
            vars,
            "JWKS_REFRESH_COOLDOWN_SECONDS",
            DEFAULT_JWKS_REFRESH_COOLDOWN_SECONDS,
            ConfigError::InvalidJwks,
        )?;

        let jwt_clock_skew_seconds = parse_seconds(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_JWT_CLOCK_SKEW_SECONDS,
            ConfigError::InvalidJwtClockSkew,
        )?;
        if jwt_clock_skew_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidJwtClockSkew(format!(
                "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                jwt_clock_skew_seconds
            )));
        }

        let shutdown_drain_seconds = parse_seconds(
            vars,
            "SHUTDOWN_DRAIN_SECONDS",
            DEFAULT_SHUTDOWN_DRAIN_SECONDS,
            ConfigError::InvalidShutdown,
        )?;

        Ok(Config {
            bind_address,
            aws_region,
            user_pool_id,
            jwks_url,
            jwks_fetch_timeout_seconds,
            jwks_refresh_cooldown_seconds,
            jwt_clock_skew_seconds,
            shutdown_drain_seconds,
        })
    }
}

/// Read a required, non-blank variable.
fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    let value = vars
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;
    Ok(value.to_string())
}

/// Parse an optional non-negative integer number of seconds.
fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    invalid: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| {
            invalid(format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}
