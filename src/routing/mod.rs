//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup, most specific wins)
//!     → matcher.rs (Exact / Prefix conditions)
//!     → rewrite.rs (replace matched prefix with rewrite target)
//!     → Return: RoutingDecision or NoRouteMatched
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → Validate (fail fast)
//!     → Compile matchers
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime; reload replaces the table
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod rewrite;
pub mod router;

pub use router::{resolve, InvalidRouteConfig, NoRouteMatched, Route, RouteTable, RoutingDecision};
