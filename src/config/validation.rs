//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (timeouts > 0, windows > 0)
//! - Detect duplicate or empty credentials
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("admission.allowed_addresses must not be empty")]
    EmptyAllowList,

    #[error("credential #{index} has an empty access key")]
    EmptyAccessKey { index: usize },

    #[error("credential '{access_key}' has an empty secret key")]
    EmptySecretKey { access_key: String },

    #[error("access key '{access_key}' is configured more than once")]
    DuplicateAccessKey { access_key: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.upstream.address.parse::<Authority>().is_err() || config.upstream.address.is_empty() {
        errors.push(ValidationError::InvalidAddress {
            field: "upstream.address",
            value: config.upstream.address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.upstream_secs" });
    }
    if config.admission.replay_window_secs == 0 {
        errors.push(ValidationError::Zero { field: "admission.replay_window_secs" });
    }
    if config.admission.allowed_addresses.iter().all(|a| a.trim().is_empty()) {
        errors.push(ValidationError::EmptyAllowList);
    }

    let mut seen = HashSet::new();
    for (index, credential) in config.credentials.iter().enumerate() {
        if credential.access_key.is_empty() {
            errors.push(ValidationError::EmptyAccessKey { index });
            continue;
        }
        if credential.secret_key.is_empty() {
            errors.push(ValidationError::EmptySecretKey {
                access_key: credential.access_key.clone(),
            });
        }
        if !seen.insert(credential.access_key.as_str()) {
            errors.push(ValidationError::DuplicateAccessKey {
                access_key: credential.access_key.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
