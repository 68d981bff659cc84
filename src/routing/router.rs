//! Route lookup and handler composition.
//!
//! # Responsibilities
//! - Store routes in a two-level `path → method → Route` table
//! - Resolve each route's middleware names at construction time
//! - Compose global + route middleware around a terminal handler
//!
//! # Design Decisions
//! - Table shape is immutable after construction (lookups take no locks)
//! - Exact match only: no prefix, parameter, case or trailing-slash folding
//! - Explicit NoMatch rather than silent default
//! - Unknown middleware names are a warning, not a construction failure

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EndpointConfig;
use crate::middleware::{default_registry, Handler, MiddlewareChain, MiddlewareRegistry};
use crate::routing::route::Route;

/// Error type for router construction.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid target URL {target:?} for {method} {path}: {source}")]
    InvalidTargetUrl {
        path: String,
        method: String,
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header name {name:?} on route {path}")]
    InvalidHeaderName { path: String, name: String },

    #[error("invalid value for header {name:?} on route {path}")]
    InvalidHeaderValue { path: String, name: String },
}

/// The route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<String, HashMap<String, Arc<Route>>>,
}

impl Router {
    /// Build a router resolving middleware from the process-wide registry.
    pub fn new(endpoints: &[EndpointConfig]) -> Result<Self, RouterError> {
        Self::with_registry(endpoints, &default_registry())
    }

    /// Build a router resolving middleware from `registry`.
    ///
    /// Fails as a whole if any endpoint is invalid.
    pub fn with_registry(
        endpoints: &[EndpointConfig],
        registry: &MiddlewareRegistry,
    ) -> Result<Self, RouterError> {
        let mut routes: HashMap<String, HashMap<String, Arc<Route>>> = HashMap::new();

        for endpoint in endpoints {
            let mut route = Route::from_endpoint(endpoint)?;

            if !route.middleware_names().is_empty() {
                let (resolved, missing) = registry.get_multiple(route.middleware_names());
                if !missing.is_empty() {
                    tracing::warn!(
                        path = %route.path(),
                        method = %route.method(),
                        missing = ?missing,
                        "Some middleware not found for route"
                    );
                }
                route.set_middlewares(resolved.into_iter().collect());
            }

            routes
                .entry(endpoint.path.clone())
                .or_default()
                .insert(endpoint.method.clone(), Arc::new(route));
        }

        let router = Self { routes };
        tracing::debug!(routes = router.len(), "Router built");
        Ok(router)
    }

    /// Exact `(path, method)` lookup.
    pub fn get_route(&self, path: &str, method: &str) -> Option<&Arc<Route>> {
        self.routes.get(path)?.get(method)
    }

    /// Install `global + route` middleware around `terminal` on every route.
    ///
    /// Recomputes every handler from scratch; calling it again replaces the
    /// previous composition.
    pub fn apply_global_middleware(&self, global: &MiddlewareChain, terminal: Handler) {
        for route in self.routes() {
            let mut chain = global.clone();
            chain.add(Arc::new(route.middlewares().clone()));
            route.store_handler(chain.then(terminal.clone()));
        }
    }

    /// Install `handler` behind the route's own middleware, bypassing the
    /// global chain.
    pub fn set_handler(&self, route: &Route, handler: Handler) {
        route.store_handler(route.middlewares().then(handler));
    }

    /// Iterate every route in the table.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.values().flat_map(HashMap::values)
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
