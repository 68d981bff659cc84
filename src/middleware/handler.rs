//! The request handler value that middleware wraps.
//!
//! A [`Handler`] is an immutable, cheaply clonable async function from a
//! request to a response. Composition never mutates a handler in place; it
//! always produces a new one that owns the handler it delegates to.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

/// Future returned by a [`Handler`].
pub type ResponseFuture = BoxFuture<'static, Response>;

type HandlerFn = dyn Fn(Request<Body>) -> ResponseFuture + Send + Sync;

/// An async request handler.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    /// Build a handler from an async function.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req| Box::pin(f(req))),
        }
    }

    /// The fallback used when a chain is terminated without a handler.
    pub fn not_found() -> Self {
        Self::from_fn(|_req| async {
            (StatusCode::NOT_FOUND, "404 page not found").into_response()
        })
    }

    /// Invoke the handler.
    pub fn handle(&self, req: Request<Body>) -> ResponseFuture {
        (self.inner)(req)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl tower::Service<Request<Body>> for Handler {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let fut = self.handle(req);
        Box::pin(async move { Ok(fut.await) })
    }
}
