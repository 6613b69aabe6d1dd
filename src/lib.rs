//! Ingress-style path router.
//!
//! Resolves request paths against an immutable table of `Exact` and `Prefix`
//! routes, rewrites the matched prefix, and forwards the request to the
//! route's backend. A path no route accepts is reported as such, never sent
//! to a default backend.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{resolve, NoRouteMatched, RouteTable, RoutingDecision};
