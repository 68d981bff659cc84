//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!     → logging.rs subscriber (filtered, formatted to stdout)
//! ```
//!
//! # Design Decisions
//! - Structured fields over formatted messages
//! - Request ID flows through the `requestId` middleware when enabled

pub mod logging;

pub use logging::init_logging;
