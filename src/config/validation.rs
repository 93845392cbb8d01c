//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check the probe origin is something the probe client can reach
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("actions.body_size_limit must be greater than zero")]
    ZeroBodyLimit,

    #[error("actions.base_path {0:?} must start with '/' and must not end with '/'")]
    BasePath(String),

    #[error("actions.allowed_origins contains an empty entry")]
    EmptyAllowedOrigin,

    #[error("probe.origin {0:?} must be an absolute http:// URL")]
    ProbeOrigin(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.actions.body_size_limit.as_u64() == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let base_path = &config.actions.base_path;
    if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.ends_with('/')) {
        errors.push(ValidationError::BasePath(base_path.clone()));
    }

    if config
        .actions
        .allowed_origins
        .iter()
        .any(|origin| origin.trim().is_empty())
    {
        errors.push(ValidationError::EmptyAllowedOrigin);
    }

    if let Some(origin) = &config.probe.origin {
        let valid = Url::parse(origin)
            .map(|url| url.scheme() == "http" && url.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::ProbeOrigin(origin.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
