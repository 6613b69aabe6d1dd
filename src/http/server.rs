//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Resolve each request against the active route table
//! - Forward matched requests to their backend with the effective path
//! - Answer unmatched requests with an explicit no-route response
//! - Swap in a new route table when the configuration changes

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{uri::Scheme, Request, Uri, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, RouteConfig};
use crate::http::request::{prepare_upstream_headers, request_id, MakeRequestUuid};
use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::routing::{InvalidRouteConfig, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<ArcSwap<RouteTable>>,
    pub client: Client<HttpConnector, Body>,
    pub request_timeout: Duration,
}

/// HTTP server for the ingress router.
pub struct HttpServer {
    router: Router,
    table: Arc<ArcSwap<RouteTable>>,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if the configured routes are invalid.
    pub fn new(config: ProxyConfig) -> Result<Self, InvalidRouteConfig> {
        let table = RouteTable::new(config.routes)?;
        metrics::record_route_count(table.len());
        let table = Arc::new(ArcSwap::from_pointee(table));

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            table: table.clone(),
            client,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        Ok(Self {
            router: Self::build_router(state),
            table,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id(req.headers()),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving in-process without a listener.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the active route table.
    pub fn route_table(&self) -> Arc<ArcSwap<RouteTable>> {
        self.table.clone()
    }

    /// Run the server until a shutdown notice arrives.
    ///
    /// Configurations received on `config_updates` replace the route table.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.table.load().len(),
            "HTTP server starting"
        );

        let table = self.table.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let _ = apply_routes(&table, config.routes);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build a table from `routes` and publish it. On error the old table stays.
pub fn apply_routes(
    table: &ArcSwap<RouteTable>,
    routes: Vec<RouteConfig>,
) -> Result<usize, InvalidRouteConfig> {
    match RouteTable::new(routes) {
        Ok(new_table) => {
            let count = new_table.len();
            table.store(Arc::new(new_table));
            metrics::record_route_count(count);
            tracing::info!(routes = count, "Route table replaced");
            Ok(count)
        }
        Err(e) => {
            tracing::error!(error = %e, "Route table rejected, keeping current routes");
            Err(e)
        }
    }
}

/// Where a matched request is going.
struct Upstream {
    route: String,
    authority: String,
    path: String,
    rewritten_prefix: Option<String>,
}

/// Main proxy handler.
/// Resolves the route, rewrites the URI and forwards the request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();

    let upstream = {
        let table = state.table.load();
        match table.resolve(&path) {
            Ok(decision) => Upstream {
                route: decision.matched_route.name.clone(),
                authority: decision.matched_route.backend_authority(),
                rewritten_prefix: decision
                    .matched_route
                    .rewrite_target
                    .as_ref()
                    .map(|_| decision.matched_route.match_path.clone()),
                path: decision.effective_path,
            },
            Err(no_route) => {
                tracing::warn!(
                    request_id = %request_id,
                    path = %path,
                    routes = table.len(),
                    "No route matched"
                );
                metrics::record_unmatched();
                return ProxyError::from(no_route).into_response();
            }
        }
    };

    tracing::debug!(
        request_id = %request_id,
        route = %upstream.route,
        backend = %upstream.authority,
        effective_path = %upstream.path,
        "Route matched"
    );

    match forward(&state, request, &upstream).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&upstream.route, status.as_u16(), start_time);
            tracing::info!(
                request_id = %request_id,
                route = %upstream.route,
                status = status.as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request forwarded"
            );
            response
        }
        Err(e) => {
            metrics::record_request(&upstream.route, e.status().as_u16(), start_time);
            tracing::error!(
                request_id = %request_id,
                route = %upstream.route,
                error = %e,
                "Upstream error"
            );
            e.into_response()
        }
    }
}

/// Send `request` to the upstream with its rewritten URI.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    upstream: &Upstream,
) -> Result<Response, ProxyError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", upstream.path, query),
        None => upstream.path.clone(),
    };
    let uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(upstream.authority.as_str())
        .path_and_query(path_and_query)
        .build()?;

    let original_uri = parts.uri.to_string();
    prepare_upstream_headers(
        &mut parts.headers,
        &original_uri,
        upstream.rewritten_prefix.as_deref(),
    );
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    let call = state.client.request(Request::from_parts(parts, body));
    match tokio::time::timeout(state.request_timeout, call).await {
        Ok(Ok(response)) => Ok(response.map(Body::new)),
        Ok(Err(source)) => Err(ProxyError::Upstream {
            backend: upstream.authority.clone(),
            source,
        }),
        Err(_) => Err(ProxyError::UpstreamTimeout {
            backend: upstream.authority.clone(),
            timeout: state.request_timeout,
        }),
    }
}
