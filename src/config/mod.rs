//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → schema.rs with_defaults (zero values → defaults)
//!     → Config (validated, immutable)
//!     → consumed once by Gateway construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{Config, EndpointConfig, GatewayConfig};
pub use validation::{validate_config, ValidationError};
