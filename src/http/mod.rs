//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, tracing, write timeout, request context)
//!     → proxy.rs (route lookup, composed middleware)
//!     → headers.rs (allow-list, static headers, User-Agent)
//!     → backend over the pooled client
//!     → response streamed back to the client
//! ```

pub mod headers;
pub mod proxy;
pub mod server;

pub use headers::{rewrite_headers, strip_hop_by_hop, GATEWAY_USER_AGENT};
pub use proxy::{ProxyError, ProxyHandler};
pub use server::{Server, ServerError, FORCE_CLOSE_GRACE};
