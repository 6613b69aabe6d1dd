//! Error responses.
//!
//! # Responsibilities
//! - Map routing and upstream failures to HTTP status codes
//! - Tag every router-generated response with `x-router-status` so a
//!   missing route is never confused with an unreachable backend
//!
//! | failure             | status | x-router-status    |
//! |---------------------|--------|--------------------|
//! | no route matched    | 404    | `no-route`         |
//! | upstream error      | 502    | `upstream-error`   |
//! | upstream timeout    | 504    | `upstream-timeout` |
//! | unbuildable request | 400    | `bad-request`      |

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

use crate::routing::NoRouteMatched;

pub const X_ROUTER_STATUS: HeaderName = HeaderName::from_static("x-router-status");

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    NoRoute(#[from] NoRouteMatched),

    #[error("upstream {backend} request failed: {source}")]
    Upstream {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {backend} did not respond within {timeout:?}")]
    UpstreamTimeout { backend: String, timeout: Duration },

    #[error("could not build upstream request: {0}")]
    InvalidUpstreamRequest(#[from] axum::http::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::InvalidUpstreamRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Value of the `x-router-status` header.
    pub fn router_status(&self) -> &'static str {
        match self {
            ProxyError::NoRoute(_) => "no-route",
            ProxyError::Upstream { .. } => "upstream-error",
            ProxyError::UpstreamTimeout { .. } => "upstream-timeout",
            ProxyError::InvalidUpstreamRequest(_) => "bad-request",
        }
    }

    /// Client-facing body. Upstream details stay in the logs.
    fn body(&self) -> String {
        match self {
            ProxyError::NoRoute(e) => e.to_string(),
            ProxyError::Upstream { .. } => "upstream request failed".to_string(),
            ProxyError::UpstreamTimeout { .. } => "upstream timed out".to_string(),
            ProxyError::InvalidUpstreamRequest(_) => "malformed request".to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.body()).into_response();
        let headers = response.headers_mut();
        headers.insert(X_ROUTER_STATUS, HeaderValue::from_static(self.router_status()));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
