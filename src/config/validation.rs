//! Configuration validation.
//!
//! Serde handles the syntax; this module checks values that parse but make no
//! sense (unbindable addresses, unknown log levels, absurd delays). All errors
//! are collected, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// Longest hashing delay accepted, in milliseconds.
pub const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener address '{0}' is not a valid socket address")]
    ListenerAddress(String),

    #[error("log level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("metrics address '{0}' is not a valid socket address")]
    MetricsAddress(String),

    #[error("hashing delay of {0}ms exceeds the {max}ms maximum", max = MAX_DELAY_MS)]
    DelayTooLong(u64),
}

/// Check a parsed configuration, returning every violation found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind_address = config.listener.bind_address();
    if bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenerAddress(bind_address));
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.hashing.delay_ms > MAX_DELAY_MS {
        errors.push(ValidationError::DelayTooLong(config.hashing.delay_ms));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
