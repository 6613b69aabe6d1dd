//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the most specific route for a request path
//! - Compute the effective backend path and URL
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Longest match path wins, earliest registration breaks ties
//! - Explicit NoRouteMatched rather than silent default

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::config::validation::{join_errors, route_label, validate_routes, ValidationError};
use crate::config::{PathType, RouteConfig};
use crate::routing::matcher::{build_matcher, Matcher};
use crate::routing::rewrite::rewrite_path;

/// No configured route accepts the request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route matches path '{path}'")]
pub struct NoRouteMatched {
    pub path: String,
}

/// The route set was rejected while building a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid route configuration: {}", join_errors(.0))]
pub struct InvalidRouteConfig(pub Vec<ValidationError>);

/// A compiled route.
#[derive(Debug, Serialize)]
pub struct Route {
    pub name: String,
    pub match_path: String,
    pub match_mode: PathType,
    pub rewrite_target: Option<String>,
    pub backend_host: String,
    pub backend_port: u16,
    #[serde(skip)]
    matcher: Box<dyn Matcher>,
}

impl Route {
    fn compile(index: usize, config: RouteConfig) -> Self {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("{}:{}", config.path_type, config.path));
        tracing::trace!(route = %route_label(index, &config), "Compiling route");

        Self {
            name,
            matcher: build_matcher(&config.path, config.path_type),
            match_path: config.path,
            match_mode: config.path_type,
            rewrite_target: config.rewrite_target,
            backend_host: config.backend_host,
            backend_port: config.backend_port,
        }
    }

    /// `host:port` of the backend. IPv6 hosts are configured bracketed.
    pub fn backend_authority(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {}",
            self.name,
            self.match_mode,
            self.match_path,
            self.backend_authority()
        )?;
        if let Some(target) = &self.rewrite_target {
            write!(f, " (rewrite {})", target)?;
        }
        Ok(())
    }
}

/// Outcome of resolving one request path.
#[derive(Debug, Serialize)]
pub struct RoutingDecision<'t> {
    pub matched_route: &'t Route,
    pub effective_path: String,
    pub backend_url: String,
}

/// Immutable, validated set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Validate and compile a route set. Order is preserved.
    pub fn new(configs: Vec<RouteConfig>) -> Result<Self, InvalidRouteConfig> {
        validate_routes(&configs).map_err(InvalidRouteConfig)?;

        let routes: Vec<Route> = configs
            .into_iter()
            .enumerate()
            .map(|(index, config)| Route::compile(index, config))
            .collect();

        tracing::debug!(routes = routes.len(), "Route table built");
        Ok(Self { routes })
    }

    /// Find the most specific route for `path`.
    pub fn resolve(&self, path: &str) -> Result<RoutingDecision<'_>, NoRouteMatched> {
        let mut best: Option<(&Route, usize)> = None;

        for route in &self.routes {
            let Some(matched_len) = route.matcher.match_len(path) else {
                continue;
            };
            // Strictly longer only, so the earlier route keeps a tie.
            let more_specific = best
                .map_or(true, |(current, _)| route.match_path.len() > current.match_path.len());
            if more_specific {
                best = Some((route, matched_len));
            }
        }

        let (route, matched_len) = best.ok_or_else(|| NoRouteMatched {
            path: path.to_string(),
        })?;

        let effective_path = match &route.rewrite_target {
            Some(target) if *target != route.match_path => rewrite_path(path, matched_len, target),
            _ => path.to_string(),
        };
        let separator = if effective_path.starts_with('/') { "" } else { "/" };
        let backend_url = format!(
            "http://{}{}{}",
            route.backend_authority(),
            separator,
            effective_path
        );

        Ok(RoutingDecision {
            matched_route: route,
            effective_path,
            backend_url,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

/// Resolve `path` against `table`.
pub fn resolve<'t>(path: &str, table: &'t RouteTable) -> Result<RoutingDecision<'t>, NoRouteMatched> {
    table.resolve(path)
}
