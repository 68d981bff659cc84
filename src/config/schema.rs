//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listener and lifecycle settings.
    pub gateway: GatewayConfig,

    /// Routes, one per `(path, method)`.
    pub endpoints: Vec<EndpointConfig>,
}

impl Config {
    /// Replace zero-valued port and timeouts with their defaults.
    pub fn with_defaults(mut self) -> Self {
        self.gateway = self.gateway.with_defaults();
        self
    }
}

/// Gateway-level settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen port on all interfaces.
    pub port: u16,

    /// Deadline for reading the request line and headers, in seconds.
    ///
    /// Request bodies are streamed to the backend and are not covered; a slow
    /// body upload is bounded by `write_timeout_secs` instead.
    pub read_timeout_secs: u64,

    /// Deadline for producing a response, in seconds. Answered with 504 on
    /// expiry; suspended once shutdown starts.
    pub write_timeout_secs: u64,

    /// Window given to in-flight requests on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,

    /// Global middleware, by registry name, outermost first.
    pub middlewares: Vec<String>,
}

impl GatewayConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.read_timeout_secs == 0 {
            self.read_timeout_secs = DEFAULT_READ_TIMEOUT_SECS;
        }
        if self.write_timeout_secs == 0 {
            self.write_timeout_secs = DEFAULT_WRITE_TIMEOUT_SECS;
        }
        if self.shutdown_timeout_secs == 0 {
            self.shutdown_timeout_secs = DEFAULT_SHUTDOWN_TIMEOUT_SECS;
        }
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            middlewares: Vec::new(),
        }
    }
}

/// A single proxied endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct EndpointConfig {
    /// Exact request path to match.
    pub path: String,

    /// Backend URL; its path replaces the request path.
    pub target: String,

    /// Exact request method to match.
    pub method: String,

    /// Headers injected into every forwarded request.
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,

    /// Inbound headers allowed through to the backend.
    #[serde(default)]
    pub allowed_headers: Vec<String>,

    /// Route middleware, by registry name, applied after the global chain.
    #[serde(default)]
    pub middlewares: Vec<String>,
}
