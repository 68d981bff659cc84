//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method)
//!     → router.rs (exact two-level lookup)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at startup):
//!     EndpointConfig[]
//!     → route.rs (parse target, header policy)
//!     → registry resolves middleware names (missing → warning)
//!     → apply_global_middleware composes each route's handler
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, table immutable at runtime
//! - No regex, no prefixes: a lookup is two hash probes
//! - Handlers swapped atomically when global middleware changes

pub mod route;
pub mod router;

pub use route::{Route, TargetError};
pub use router::{Router, RouterError};
