//! Request entry point and backend forwarding.
//!
//! # Request State Machine
//! ```text
//! Received
//!     → context already cancelled?  → 503, Connection: close
//!     → route lookup                → 404 "Route Not Found"
//!     → composed handler (middleware may short-circuit)
//!     → terminal step: rewrite headers, forward
//!         → backend response streamed back
//!         → backend error           → 502 "Gateway error"
//!         → context cancelled       → 503 "Gateway is shutting down"
//! ```
//!
//! # Design Decisions
//! - The terminal step looks the route up again on every request, so route
//!   handlers can be recomposed without capturing stale routes
//! - Shutdown cancellation is checked explicitly, before dispatch and while
//!   waiting on the backend, and is never reported as a backend error
//! - No retries, no buffering: the request body streams straight through
//! - Backend responses lose their hop-by-hop headers, nothing else

use std::sync::{Arc, Weak};

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::headers::{rewrite_headers, strip_hop_by_hop};
use crate::lifecycle::RequestContext;
use crate::middleware::{Handler, MiddlewareChain};
use crate::routing::{Route, Router, TargetError};

/// Reasons a forwarded request did not produce a backend response.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("backend request failed: {0}")]
    Backend(#[from] hyper_util::client::legacy::Error),

    #[error("request cancelled while the gateway is shutting down")]
    Cancelled,

    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Backend(_) | ProxyError::InvalidTarget(_) => {
                (StatusCode::BAD_GATEWAY, "Gateway error").into_response()
            }
            ProxyError::Cancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::CONNECTION, HeaderValue::from_static("close"))],
                "Gateway is shutting down",
            )
                .into_response(),
        }
    }
}

fn route_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Route Not Found").into_response()
}

fn already_cancelled() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONNECTION, HeaderValue::from_static("close"))],
    )
        .into_response()
}

/// Forwards requests to route targets over a pooled HTTP client.
#[derive(Clone)]
struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }

    async fn forward(&self, req: Request<Body>, route: &Route) -> Result<Response, ProxyError> {
        let context = req.extensions().get::<RequestContext>().cloned();
        let (parts, body) = req.into_parts();

        let uri = route.outgoing_uri(parts.uri.query())?;
        tracing::debug!(
            method = %parts.method,
            path = %parts.uri.path(),
            target = %uri,
            "Proxying request"
        );

        let mut outgoing = Request::new(body);
        *outgoing.method_mut() = parts.method;
        *outgoing.uri_mut() = uri;
        *outgoing.headers_mut() = rewrite_headers(&parts.headers, route);

        let response = match context {
            Some(context) => {
                tokio::select! {
                    biased;
                    _ = context.cancelled() => return Err(ProxyError::Cancelled),
                    res = self.client.request(outgoing) => res?,
                }
            }
            None => self.client.request(outgoing).await?,
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    async fn forward_or_error(&self, req: Request<Body>, route: &Route) -> Response {
        let path = route.path().to_string();
        let method = route.method().to_string();

        match self.forward(req, route).await {
            Ok(res) => res,
            Err(ProxyError::Cancelled) => {
                tracing::info!(path = %path, method = %method, "Request cancelled by shutdown");
                ProxyError::Cancelled.into_response()
            }
            Err(e) => {
                tracing::error!(path = %path, method = %method, error = %e, "Upstream error");
                e.into_response()
            }
        }
    }
}

/// The gateway's request handler.
#[derive(Clone)]
pub struct ProxyHandler {
    router: Arc<Router>,
    forwarder: Forwarder,
}

impl ProxyHandler {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            forwarder: Forwarder::new(),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Handle one inbound request.
    pub async fn serve(&self, req: Request<Body>) -> Response {
        if req
            .extensions()
            .get::<RequestContext>()
            .is_some_and(RequestContext::is_cancelled)
        {
            return already_cancelled();
        }

        let Some(route) = self.router.get_route(req.uri().path(), req.method().as_str()) else {
            tracing::debug!(path = %req.uri().path(), method = %req.method(), "No route matched");
            return route_not_found();
        };

        match route.handler() {
            Some(handler) => handler.handle(req).await,
            None => self.forwarder.forward_or_error(req, route).await,
        }
    }

    /// Compose `global` + route middleware around the forwarding step on
    /// every route.
    pub fn initialize_route_handlers(&self, global: &MiddlewareChain) {
        self.router.apply_global_middleware(global, self.terminal_handler());
    }

    /// Looks the route up again and forwards to it.
    ///
    /// Holds the router weakly: routes own this handler, so a strong
    /// reference would keep the table alive forever.
    fn terminal_handler(&self) -> Handler {
        let router: Weak<Router> = Arc::downgrade(&self.router);
        let forwarder = self.forwarder.clone();

        Handler::from_fn(move |req| {
            let router = router.upgrade();
            let forwarder = forwarder.clone();
            async move {
                let Some(router) = router else {
                    return route_not_found();
                };
                let Some(route) = router.get_route(req.uri().path(), req.method().as_str()) else {
                    return route_not_found();
                };
                forwarder.forward_or_error(req, route).await
            }
        })
    }

    /// Wrap this proxy as a [`Handler`] for the server.
    pub fn into_handler(self) -> Handler {
        Handler::from_fn(move |req| {
            let proxy = self.clone();
            async move { proxy.serve(req).await }
        })
    }
}
