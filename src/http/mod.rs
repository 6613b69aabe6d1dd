//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing span)
//!     → routing (resolve path against the active RouteTable)
//!         ├─ NoRouteMatched → response.rs (404, x-router-status: no-route)
//!         └─ RoutingDecision
//!             → request.rs (strip hop-by-hop, add forwarding headers)
//!             → upstream call with rewritten URI
//!             → stream backend response to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ProxyError, X_ROUTER_STATUS};
pub use server::{apply_routes, HttpServer};
