//! Ordered middleware composition.
//!
//! # Design Decisions
//! - The first middleware added is the outermost: it runs first on the way
//!   in and last on the way out
//! - Cloning copies the list; the clone and the original never share storage
//! - A chain is itself a [`Middleware`], so chains nest

use std::fmt;
use std::sync::Arc;

use super::handler::Handler;

/// Anything that can wrap a handler in another handler.
pub trait Middleware: Send + Sync {
    /// Return a handler that may act before and/or after delegating to `next`.
    fn wrap(&self, next: Handler) -> Handler;
}

/// Shared, type-erased middleware as stored in chains and registries.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// Adapts a plain function into a [`Middleware`].
pub struct MiddlewareFn<F> {
    f: F,
}

impl<F> MiddlewareFn<F>
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    fn wrap(&self, next: Handler) -> Handler {
        (self.f)(next)
    }
}

/// Shorthand for `Arc::new(MiddlewareFn::new(f))`.
pub fn from_fn<F>(f: F) -> SharedMiddleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(MiddlewareFn::new(f))
}

/// An ordered list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<SharedMiddleware>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware.
    pub fn add(&mut self, middleware: SharedMiddleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Append a middleware function.
    pub fn add_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        self.add(from_fn(f))
    }

    /// Collapse the chain around `final_handler`.
    pub fn then(&self, final_handler: Handler) -> Handler {
        // Wrap innermost first so that the first-added middleware ends up outermost.
        self.middlewares
            .iter()
            .rev()
            .fold(final_handler, |handler, middleware| middleware.wrap(handler))
    }

    /// Like [`then`](Self::then), falling back to [`Handler::not_found`].
    pub fn then_or_default(&self, final_handler: Option<Handler>) -> Handler {
        self.then(final_handler.unwrap_or_else(Handler::not_found))
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl Middleware for MiddlewareChain {
    fn wrap(&self, next: Handler) -> Handler {
        self.then(next)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

impl FromIterator<SharedMiddleware> for MiddlewareChain {
    fn from_iter<I: IntoIterator<Item = SharedMiddleware>>(iter: I) -> Self {
        Self {
            middlewares: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, Request, StatusCode},
        response::IntoResponse,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recording(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> SharedMiddleware {
        from_fn(move |next: Handler| {
            let log = log.clone();
            Handler::from_fn(move |req| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{name}-before"));
                    let res = next.handle(req).await;
                    log.lock().unwrap().push(format!("{name}-after"));
                    res
                }
            })
        })
    }

    fn marker(header: &'static str) -> SharedMiddleware {
        from_fn(move |next: Handler| {
            Handler::from_fn(move |req| {
                let next = next.clone();
                async move {
                    let mut res = next.handle(req).await;
                    res.headers_mut().insert(header, HeaderValue::from_static("1"));
                    res
                }
            })
        })
    }

    fn ok_handler() -> Handler {
        Handler::from_fn(|_req| async { StatusCode::OK.into_response() })
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn first_added_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let counter = Arc::new(AtomicUsize::new(0));

        let mut chain = MiddlewareChain::new();
        chain
            .add(recording("A", log.clone()))
            .add(recording("B", log.clone()));

        let final_log = log.clone();
        let final_counter = counter.clone();
        let handler = chain.then(Handler::from_fn(move |_req| {
            let log = final_log.clone();
            let counter = final_counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                log.lock().unwrap().push("final".to_string());
                StatusCode::OK.into_response()
            }
        }));

        let res = handler.handle(request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["A-before", "B-before", "final", "B-after", "A-after"]
        );
    }

    #[tokio::test]
    async fn clone_is_independent() {
        let mut original = MiddlewareChain::new();
        original.add(marker("x-original"));

        let mut cloned = original.clone();
        cloned.add(marker("x-clone-only"));

        assert_eq!(original.len(), 1);
        assert_eq!(cloned.len(), 2);

        let res = original.then(ok_handler()).handle(request()).await;
        assert!(res.headers().contains_key("x-original"));
        assert!(!res.headers().contains_key("x-clone-only"));

        let res = cloned.then(ok_handler()).handle(request()).await;
        assert!(res.headers().contains_key("x-original"));
        assert!(res.headers().contains_key("x-clone-only"));
    }

    #[tokio::test]
    async fn appending_to_original_does_not_affect_clone() {
        let mut original = MiddlewareChain::new();
        let cloned = original.clone();
        original.add(marker("x-late"));

        let res = cloned.then(ok_handler()).handle(request()).await;
        assert!(!res.headers().contains_key("x-late"));
    }

    #[tokio::test]
    async fn missing_final_handler_uses_fallback() {
        let mut chain = MiddlewareChain::new();
        chain.add(marker("x-seen"));

        let res = chain.then_or_default(None).handle(request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key("x-seen"));
    }

    #[tokio::test]
    async fn nested_chain_runs_after_outer_entries() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut inner = MiddlewareChain::new();
        inner.add(recording("inner", log.clone()));

        let mut outer = MiddlewareChain::new();
        outer.add(recording("outer", log.clone()));
        outer.add(Arc::new(inner));

        outer.then(ok_handler()).handle(request()).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer-before", "inner-before", "inner-after", "outer-after"]
        );
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let mut chain = MiddlewareChain::new();
        chain.add_fn(|_next| {
            Handler::from_fn(|_req| async { StatusCode::UNAUTHORIZED.into_response() })
        });

        let called = Arc::new(AtomicUsize::new(0));
        let c = called.clone();
        let handler = chain.then(Handler::from_fn(move |_req| {
            c.fetch_add(1, Ordering::SeqCst);
            async { StatusCode::OK.into_response() }
        }));

        let res = handler.handle(request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
