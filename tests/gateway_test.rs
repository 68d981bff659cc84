//! End-to-end proxying through a running gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use heimdall::middleware::{from_fn, register_defaults, Handler, SharedMiddleware};
use heimdall::MiddlewareRegistry;

mod common;

/// Middleware appending `x-trace: <name>` to the request on the way in.
fn tracing_tag(name: &'static str) -> SharedMiddleware {
    from_fn(move |next: Handler| {
        Handler::from_fn(move |mut req| {
            let next = next.clone();
            async move {
                req.headers_mut()
                    .append("x-trace", HeaderValue::from_static(name));
                next.handle(req).await
            }
        })
    })
}

fn header_lines(body: &str) -> Vec<&str> {
    body.lines().skip(1).collect()
}

#[tokio::test]
async fn forwards_with_header_policy() {
    let backend = common::start_echo_backend(Duration::ZERO).await;

    let mut endpoint =
        common::endpoint("/test", "GET", format!("http://{backend}/internal/test?key=abc"));
    endpoint.allowed_headers = vec!["X-Fwd".into()];
    endpoint.headers = HashMap::from([("X-Static".into(), vec!["v1".into(), "v2".into()])]);

    let gw = common::spawn_gateway(common::gateway(
        common::config(vec![endpoint], 5),
        Arc::new(MiddlewareRegistry::new()),
    ))
    .await;

    let res = reqwest::Client::new()
        .get(gw.url("/test?page=2"))
        .header("X-Fwd", "keep")
        .header("X-Drop", "gone")
        .header("User-Agent", "curl/8.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body = res.text().await.unwrap();
    let request_line = body.lines().next().unwrap();
    assert_eq!(request_line, "GET /internal/test?key=abc&page=2 HTTP/1.1");

    let mut headers: Vec<String> = header_lines(&body)
        .into_iter()
        .map(str::to_ascii_lowercase)
        .filter(|l| !l.starts_with("host:"))
        .collect();
    headers.sort();
    assert_eq!(
        headers,
        vec![
            "user-agent: heimdall/0.1",
            "x-fwd: keep",
            "x-static: v1",
            "x-static: v2",
        ]
    );

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_route_is_404() {
    let backend = common::start_echo_backend(Duration::ZERO).await;
    let gw = common::spawn_gateway(common::gateway(
        common::config(
            vec![common::endpoint("/users", "GET", format!("http://{backend}/users"))],
            5,
        ),
        Arc::new(MiddlewareRegistry::new()),
    ))
    .await;

    let client = reqwest::Client::new();
    for (method, path) in [("GET", "/missing"), ("POST", "/users"), ("GET", "/users/")] {
        let res = client
            .request(method.parse().unwrap(), gw.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 404, "{method} {path}");
        assert_eq!(res.text().await.unwrap(), "Route Not Found");
    }

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_backend_is_502() {
    let dead = common::closed_port().await;
    let gw = common::spawn_gateway(common::gateway(
        common::config(vec![common::endpoint("/dead", "GET", format!("http://{dead}/"))], 5),
        Arc::new(MiddlewareRegistry::new()),
    ))
    .await;

    let res = reqwest::get(gw.url("/dead")).await.unwrap();
    assert_eq!(res.status(), 502);
    assert!(res.text().await.unwrap().contains("Gateway error"));

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn global_middleware_runs_before_route_middleware() {
    let backend = common::start_echo_backend(Duration::ZERO).await;

    let registry = Arc::new(MiddlewareRegistry::new());
    registry.register("global", tracing_tag("global")).unwrap();
    registry.register("route", tracing_tag("route")).unwrap();

    let mut endpoint = common::endpoint("/traced", "GET", format!("http://{backend}/"));
    endpoint.allowed_headers = vec!["X-Trace".into()];
    endpoint.middlewares = vec!["route".into(), "missing".into()];

    let mut config = common::config(vec![endpoint], 5);
    config.gateway.middlewares = vec!["global".into()];

    let gw = common::spawn_gateway(common::gateway(config, registry)).await;

    let body = reqwest::get(gw.url("/traced")).await.unwrap().text().await.unwrap();
    let traces: Vec<&str> = header_lines(&body)
        .into_iter()
        .filter(|l| l.to_ascii_lowercase().starts_with("x-trace:"))
        .collect();
    assert_eq!(traces, vec!["x-trace: global", "x-trace: route"]);

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn use_middleware_applies_to_later_requests() {
    let backend = common::start_echo_backend(Duration::ZERO).await;
    let gw = common::spawn_gateway(common::gateway(
        common::config(vec![common::endpoint("/a", "GET", format!("http://{backend}/"))], 5),
        Arc::new(MiddlewareRegistry::new()),
    ))
    .await;

    let res = reqwest::get(gw.url("/a")).await.unwrap();
    assert!(!res.headers().contains_key("x-added"));

    gw.gateway.use_fn(|next| {
        Handler::from_fn(move |req| {
            let next = next.clone();
            async move {
                let mut res = next.handle(req).await;
                res.headers_mut()
                    .insert("x-added", HeaderValue::from_static("yes"));
                res
            }
        })
    });

    let res = reqwest::get(gw.url("/a")).await.unwrap();
    assert_eq!(res.headers()["x-added"], "yes");
    assert_eq!(res.status(), 200);

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn builtin_middleware_by_name() {
    let backend = common::start_echo_backend(Duration::ZERO).await;

    let registry = Arc::new(MiddlewareRegistry::new());
    register_defaults(&registry);

    let mut endpoint = common::endpoint("/api", "GET", format!("http://{backend}/"));
    endpoint.allowed_headers = vec!["X-Request-Id".into()];
    endpoint.middlewares = vec!["cors".into()];

    let mut config = common::config(vec![endpoint], 5);
    config.gateway.middlewares = vec!["logger".into(), "requestId".into()];

    let gw = common::spawn_gateway(common::gateway(config, registry)).await;

    let res = reqwest::Client::new()
        .get(gw.url("/api"))
        .header("Origin", "http://app.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "http://app.example");

    let id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = res.text().await.unwrap();
    assert!(
        body.to_ascii_lowercase().contains(&format!("x-request-id: {id}")),
        "{body}"
    );

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn backend_hop_by_hop_headers_do_not_reach_the_client() {
    let backend = common::start_raw_backend(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 2\r\n\
         Connection: close, X-Secret\r\n\
         Keep-Alive: timeout=1\r\n\
         X-Secret: leak\r\n\
         X-Public: ok\r\n\
         \r\n\
         ok",
    )
    .await;
    let gw = common::spawn_gateway(common::gateway(
        common::config(vec![common::endpoint("/hop", "GET", format!("http://{backend}/"))], 5),
        Arc::new(MiddlewareRegistry::new()),
    ))
    .await;

    let res = reqwest::get(gw.url("/hop")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-public"], "ok");
    assert!(!res.headers().contains_key("x-secret"));
    assert!(!res.headers().contains_key("keep-alive"));
    assert_eq!(res.text().await.unwrap(), "ok");

    gw.lifecycle.cancel();
    gw.handle.await.unwrap().unwrap();
}
