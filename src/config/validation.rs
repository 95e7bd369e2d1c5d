//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("operserv.client is required")]
    MissingClient,
    #[error("xlines.expire_interval must be at least 1 second")]
    InvalidExpireInterval,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.operserv.client.trim().is_empty() {
        errors.push(ValidationError::MissingClient);
    }
    if config.xlines.expire_interval == 0 {
        errors.push(ValidationError::InvalidExpireInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
