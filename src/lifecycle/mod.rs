//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel lifecycle token
//!
//! Shutdown (http::server):
//!     lifecycle token cancelled → stop accepting → drain connections
//!     → drain window elapsed → cancel request context (context.rs)
//!     → in-flight proxy calls answer 503
//! ```
//!
//! # Design Decisions
//! - Two tokens: the lifecycle token (owned by the process) and the
//!   request token (owned by the server, shared by every request)
//! - Shutdown has timeout: forced cancellation after deadline

pub mod context;
pub mod signals;

pub use context::RequestContext;
pub use signals::{cancel_on_signal, shutdown_signal};
