//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     register_defaults / register_middleware(name, m)
//!     → registry.rs (name → middleware)
//!     → routing resolves configured names into per-route chains
//!
//! Composition:
//!     global chain (cloned) + route chain
//!     → chain.rs then(terminal)
//!     → handler.rs Handler (immutable, swapped wholesale)
//! ```
//!
//! # Design Decisions
//! - Middleware is a single capability: wrap a handler in a handler
//! - Closures and objects compose through the same trait
//! - Missing names are the caller's problem; the registry only reports them

pub mod chain;
pub mod cors;
pub mod handler;
pub mod logger;
pub mod registry;
pub mod request_id;

pub use chain::{from_fn, Middleware, MiddlewareChain, MiddlewareFn, SharedMiddleware};
pub use cors::{cors, CorsConfig};
pub use handler::{Handler, ResponseFuture};
pub use logger::logger;
pub use registry::{default_registry, register_middleware, MiddlewareRegistry, RegistryError};
pub use request_id::{request_id, X_REQUEST_ID};

/// Register the built-in middleware (`logger`, `cors`, `requestId`).
///
/// Names that are already taken are left untouched.
pub fn register_defaults(registry: &MiddlewareRegistry) {
    let builtins: [(&str, SharedMiddleware); 3] = [
        ("logger", logger()),
        ("cors", cors(None)),
        ("requestId", request_id()),
    ];

    for (name, middleware) in builtins {
        if let Err(e) = registry.register(name, middleware) {
            tracing::debug!(error = %e, "Built-in middleware not registered");
        }
    }
}
