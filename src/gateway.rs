//! The embeddable gateway.
//!
//! # Responsibilities
//! - Build the router, proxy and server from a [`Config`]
//! - Own the global middleware chain and recompose route handlers when it
//!   changes
//! - Expose the middleware registry it resolves names against
//!
//! # Design Decisions
//! - Global middleware writers are serialised; readers never lock, they
//!   load the route's current handler
//! - Unknown middleware names are warnings, invalid routes are errors

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{load_config, validate_config, Config, ConfigError};
use crate::http::{ProxyHandler, Server, ServerError};
use crate::middleware::{
    default_registry, from_fn, Handler, MiddlewareChain, MiddlewareRegistry, RegistryError,
    SharedMiddleware,
};
use crate::routing::{Router, RouterError};

/// Errors building a gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Router(#[from] RouterError),
}

/// A configured gateway, ready to serve.
pub struct Gateway {
    config: Config,
    proxy: ProxyHandler,
    server: Server,
    global: Mutex<MiddlewareChain>,
    registry: Arc<MiddlewareRegistry>,
}

impl Gateway {
    /// Build a gateway resolving middleware from the process-wide registry.
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        Self::with_registry(config, default_registry())
    }

    /// Build a gateway resolving middleware from `registry`.
    pub fn with_registry(
        config: Config,
        registry: Arc<MiddlewareRegistry>,
    ) -> Result<Self, GatewayError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let config = config.with_defaults();

        let router = Arc::new(Router::with_registry(&config.endpoints, &registry)?);

        let (resolved, missing) = registry.get_multiple(config.gateway.middlewares.as_slice());
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "Some global middleware not found");
        }
        let global: MiddlewareChain = resolved.into_iter().collect();

        let proxy = ProxyHandler::new(router);
        proxy.initialize_route_handlers(&global);

        let server = Server::new(config.gateway.clone(), proxy.clone().into_handler());

        tracing::info!(
            routes = proxy.router().len(),
            global_middleware = global.len(),
            "Gateway initialized"
        );

        Ok(Self {
            config,
            proxy,
            server,
            global: Mutex::new(global),
            registry,
        })
    }

    /// Load `path` and build a gateway on the process-wide registry.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        Self::from_file_with_registry(path, default_registry())
    }

    pub fn from_file_with_registry(
        path: impl AsRef<Path>,
        registry: Arc<MiddlewareRegistry>,
    ) -> Result<Self, GatewayError> {
        let config = load_config(path.as_ref())?;
        Self::with_registry(config, registry)
    }

    /// Append `middleware` to the global chain.
    ///
    /// Every route handler has been recomposed by the time this returns.
    pub fn use_middleware(&self, middleware: SharedMiddleware) -> &Self {
        let mut global = self.global.lock();
        global.add(middleware);
        self.proxy.initialize_route_handlers(&global);
        self
    }

    /// Append a middleware function to the global chain.
    pub fn use_fn<F>(&self, f: F) -> &Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        self.use_middleware(from_fn(f))
    }

    /// Register `middleware` under `name` in this gateway's registry.
    ///
    /// Only affects names resolved afterwards.
    pub fn register_middleware(
        &self,
        name: impl Into<String>,
        middleware: SharedMiddleware,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, middleware)
    }

    pub fn get_middleware(&self, name: &str) -> Option<SharedMiddleware> {
        self.registry.get(name)
    }

    /// Bind the configured port and serve until `lifecycle` is cancelled.
    pub async fn start(&self, lifecycle: CancellationToken) -> Result<(), ServerError> {
        self.server.start(lifecycle).await
    }

    /// Serve on an already-bound listener until `lifecycle` is cancelled.
    pub async fn serve(
        &self,
        listener: TcpListener,
        lifecycle: CancellationToken,
    ) -> Result<(), ServerError> {
        self.server.serve(listener, lifecycle).await
    }

    /// The resolved configuration, defaults filled.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &Arc<Router> {
        self.proxy.router()
    }
}
