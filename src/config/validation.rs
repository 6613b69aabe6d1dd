//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject malformed route paths and rewrite targets
//! - Validate backend addresses and value ranges (timeouts > 0, ports valid)
//! - Detect duplicate routes that could never be selected
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{PathType, ProxyConfig, RouteConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{route}: path is empty")]
    EmptyPath { route: String },

    #[error("{route}: path '{path}' {reason}")]
    MalformedPath {
        route: String,
        path: String,
        reason: &'static str,
    },

    #[error("{route}: rewrite target '{target}' {reason}")]
    MalformedRewrite {
        route: String,
        target: String,
        reason: &'static str,
    },

    #[error("{route}: invalid backend host '{host}'")]
    InvalidBackendHost { route: String, host: String },

    #[error("{route}: backend port must be non-zero")]
    InvalidBackendPort { route: String },

    #[error("{route}: duplicates {first} ({path_type} '{path}') and can never match")]
    DuplicateRoute {
        route: String,
        first: String,
        path: String,
        path_type: PathType,
    },

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Label used to point at a route in error messages.
pub fn route_label(index: usize, route: &RouteConfig) -> String {
    match &route.name {
        Some(name) => format!("route '{}'", name),
        None => format!("routes[{}]", index),
    }
}

/// Render a list of errors on one line.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a whole configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if let Err(route_errors) = validate_routes(&config.routes) {
        errors.extend(route_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a route set on its own. Used when building a route table.
pub fn validate_routes(routes: &[RouteConfig]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen: HashMap<(&str, PathType), String> = HashMap::new();

    for (index, route) in routes.iter().enumerate() {
        let label = route_label(index, route);

        match check_path(&route.path) {
            _ if route.path.is_empty() => errors.push(ValidationError::EmptyPath {
                route: label.clone(),
            }),
            Some(reason) => errors.push(ValidationError::MalformedPath {
                route: label.clone(),
                path: route.path.clone(),
                reason,
            }),
            None => {
                let key = (route.path.as_str(), route.path_type);
                if let Some(first) = seen.get(&key) {
                    errors.push(ValidationError::DuplicateRoute {
                        route: label.clone(),
                        first: first.clone(),
                        path: route.path.clone(),
                        path_type: route.path_type,
                    });
                } else {
                    seen.insert(key, label.clone());
                }
            }
        }

        if let Some(target) = &route.rewrite_target {
            if let Some(reason) = check_path(target) {
                errors.push(ValidationError::MalformedRewrite {
                    route: label.clone(),
                    target: target.clone(),
                    reason,
                });
            }
        }

        if url::Host::parse(&route.backend_host).is_err() {
            errors.push(ValidationError::InvalidBackendHost {
                route: label.clone(),
                host: route.backend_host.clone(),
            });
        }

        if route.backend_port == 0 {
            errors.push(ValidationError::InvalidBackendPort { route: label });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Returns why `path` is not a usable absolute path, if it isn't.
fn check_path(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        Some("is empty")
    } else if !path.starts_with('/') {
        Some("must begin with '/'")
    } else if path.contains(['?', '#']) {
        Some("must not contain a query or fragment")
    } else if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("must not contain whitespace or control characters")
    } else {
        None
    }
}
