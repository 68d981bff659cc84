//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Target URLs are parsed by the router, which owns that failure mode

use std::collections::HashSet;

use crate::config::schema::Config;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("endpoint #{index}: path must start with '/' (got {path:?})")]
    InvalidPath { index: usize, path: String },

    #[error("endpoint #{index} ({path}): method is empty")]
    EmptyMethod { index: usize, path: String },

    #[error("endpoint #{index} ({path}): target is empty")]
    EmptyTarget { index: usize, path: String },

    #[error("endpoint #{index}: duplicate route {method} {path}")]
    DuplicateRoute {
        index: usize,
        path: String,
        method: String,
    },
}

/// Check a parsed configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if !endpoint.path.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                index,
                path: endpoint.path.clone(),
            });
        }
        if endpoint.method.is_empty() {
            errors.push(ValidationError::EmptyMethod {
                index,
                path: endpoint.path.clone(),
            });
        }
        if endpoint.target.trim().is_empty() {
            errors.push(ValidationError::EmptyTarget {
                index,
                path: endpoint.path.clone(),
            });
        }
        if !seen.insert((endpoint.path.as_str(), endpoint.method.as_str())) {
            errors.push(ValidationError::DuplicateRoute {
                index,
                path: endpoint.path.clone(),
                method: endpoint.method.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
