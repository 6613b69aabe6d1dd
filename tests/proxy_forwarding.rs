//! End-to-end tests: router in front of mock backends.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use ingress_router::config::{PathType, ProxyConfig, RouteConfig};
use ingress_router::http::{HttpServer, X_REQUEST_ID, X_ROUTER_STATUS};

mod common;

fn config_with(routes: Vec<RouteConfig>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.routes = routes;
    config
}

#[tokio::test]
async fn test_rewritten_path_reaches_backend() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(config_with(vec![
        RouteConfig::new("/api/", PathType::Prefix, "127.0.0.1", backend.port()).with_rewrite("/"),
    ]))
    .await;

    let res = common::client()
        .get(proxy.url("/api/notes?page=2"))
        .header("host", "notes.local")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    let head = res.text().await.unwrap().to_lowercase();
    assert!(head.starts_with("get /notes?page=2 http/1.1"), "got: {head}");
    assert!(head.contains("x-forwarded-prefix: /api/"));
    assert!(head.contains("x-original-uri: /api/notes?page=2"));
    assert!(head.contains("x-forwarded-host: notes.local"));
    assert!(head.contains("x-request-id: "));

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_unrewritten_path_forwarded_as_is() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(config_with(vec![
        RouteConfig::new("/", PathType::Prefix, "127.0.0.1", backend.port()),
    ]))
    .await;

    let res = common::client()
        .post(proxy.url("/api/items"))
        .body("title=hello")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let head = res.text().await.unwrap().to_lowercase();
    assert!(head.starts_with("post /api/items http/1.1"), "got: {head}");
    assert!(!head.contains("x-forwarded-prefix"));

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_no_route_is_distinct_from_backend_failure() {
    let backend = common::start_echo_backend().await;
    let dead = common::unused_addr().await;
    let proxy = common::start_proxy(config_with(vec![
        RouteConfig::new("/api", PathType::Exact, "127.0.0.1", backend.port()),
        RouteConfig::new("/down/", PathType::Prefix, "127.0.0.1", dead.port()),
    ]))
    .await;
    let client = common::client();

    let res = client.get(proxy.url("/api")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client.get(proxy.url("/api/items")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()[X_ROUTER_STATUS.as_str()], "no-route");
    assert_eq!(res.text().await.unwrap(), "no route matches path '/api/items'");

    let res = client.get(proxy.url("/down/x")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()[X_ROUTER_STATUS.as_str()], "upstream-error");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_timeout() {
    let backend = common::start_silent_backend().await;
    let mut config = config_with(vec![
        RouteConfig::new("/", PathType::Prefix, "127.0.0.1", backend.port()),
    ]);
    config.timeouts.request_secs = 1;
    let proxy = common::start_proxy(config).await;

    let res = common::client().get(proxy.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), 504);
    assert_eq!(res.headers()[X_ROUTER_STATUS.as_str()], "upstream-timeout");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_client_request_id_propagated() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(config_with(vec![
        RouteConfig::new("/", PathType::Prefix, "127.0.0.1", backend.port()),
    ]))
    .await;

    let res = common::client()
        .get(proxy.url("/"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()[X_REQUEST_ID.as_str()], "req-123");
    assert!(res.text().await.unwrap().contains("x-request-id: req-123"));

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_reload_replaces_route_table() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(config_with(vec![
        RouteConfig::new("/api", PathType::Exact, "127.0.0.1", backend.port()),
    ]))
    .await;
    let client = common::client();

    let res = client.get(proxy.url("/api/items")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    proxy
        .config_updates
        .send(config_with(vec![
            RouteConfig::new("/api/", PathType::Prefix, "127.0.0.1", backend.port())
                .with_rewrite("/"),
        ]))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(proxy.url("/api/items")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().starts_with("GET /items HTTP/1.1"));

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_reload_keeps_current_table() {
    let server = HttpServer::new(config_with(vec![
        RouteConfig::new("/", PathType::Prefix, "svc", 8000),
    ]))
    .unwrap();
    let table = server.route_table();

    let result = ingress_router::http::apply_routes(
        &table,
        vec![RouteConfig::new("api", PathType::Prefix, "svc", 8000)],
    );

    assert!(result.is_err());
    assert_eq!(table.load().len(), 1);
    assert!(table.load().resolve("/anything").is_ok());
}

#[tokio::test]
async fn test_empty_table_answers_no_route_in_process() {
    let server = HttpServer::new(ProxyConfig::default()).unwrap();

    let response = server
        .app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[X_ROUTER_STATUS], "no-route");
    assert!(response.headers().contains_key(X_REQUEST_ID));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"no route matches path '/'");
}

#[test]
fn test_invalid_routes_fail_at_startup() {
    let result = HttpServer::new(config_with(vec![
        RouteConfig::new("", PathType::Prefix, "svc", 8000),
    ]));
    assert!(result.is_err());
}
