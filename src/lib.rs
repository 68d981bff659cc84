//! Heimdall: a config-driven HTTP API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────▶ net (listener) ──▶ http::server ──▶ http::proxy
//!                                                     │
//!                                     routing (exact path + method)
//!                                                     │
//!                                  global chain ─▶ route chain ─▶ forward
//!                                                     │
//!     Client Response                                 ▼
//!     ◀────── http::server ◀──── streamed backend response ◀── Backend
//!
//!     Cross-cutting: config, middleware registry, lifecycle, observability
//! ```
//!
//! # Embedding
//!
//! ```no_run
//! use heimdall::{middleware, Gateway};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! middleware::register_defaults(&middleware::default_registry());
//!
//! let gateway = Gateway::from_file("config.toml")?;
//! let lifecycle = CancellationToken::new();
//! tokio::spawn(heimdall::lifecycle::cancel_on_signal(lifecycle.clone()));
//! gateway.start(lifecycle).await?;
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod config;
pub mod gateway;
pub mod http;
pub mod net;
pub mod routing;

// Request pipeline
pub mod middleware;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{Config, EndpointConfig, GatewayConfig};
pub use gateway::{Gateway, GatewayError};
pub use lifecycle::RequestContext;
pub use middleware::{Handler, Middleware, MiddlewareChain, MiddlewareRegistry, SharedMiddleware};
