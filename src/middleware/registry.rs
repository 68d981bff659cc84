//! Name → middleware lookup used to resolve configuration references.
//!
//! # Design Decisions
//! - Names are unique; registering twice is an error, never an overwrite
//! - Lookups never fail; partial resolution reports the missing names and
//!   leaves the decision to the caller
//! - One process-wide instance is reachable through [`default_registry`];
//!   tests construct their own instead of resetting shared state

use std::sync::{Arc, OnceLock};

use dashmap::{mapref::entry::Entry, DashMap};

use super::chain::SharedMiddleware;

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("middleware with name '{0}' already registered")]
    AlreadyRegistered(String),
}

/// Concurrent middleware registry.
#[derive(Default)]
pub struct MiddlewareRegistry {
    middlewares: DashMap<String, SharedMiddleware>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `middleware` under `name`.
    pub fn register(
        &self,
        name: impl Into<String>,
        middleware: SharedMiddleware,
    ) -> Result<(), RegistryError> {
        match self.middlewares.entry(name.into()) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(name = %entry.key(), "Middleware registered");
                entry.insert(middleware);
                Ok(())
            }
        }
    }

    /// Look up a single middleware.
    pub fn get(&self, name: &str) -> Option<SharedMiddleware> {
        self.middlewares.get(name).map(|entry| entry.value().clone())
    }

    /// Resolve `names` in order.
    ///
    /// Returns the middleware that were found and the names that were not.
    pub fn get_multiple<S: AsRef<str>>(&self, names: &[S]) -> (Vec<SharedMiddleware>, Vec<String>) {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();

        for name in names {
            match self.get(name.as_ref()) {
                Some(middleware) => found.push(middleware),
                None => missing.push(name.as_ref().to_string()),
            }
        }

        (found, missing)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.middlewares.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.middlewares.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("MiddlewareRegistry").field("names", &names).finish()
    }
}

static DEFAULT_REGISTRY: OnceLock<Arc<MiddlewareRegistry>> = OnceLock::new();

/// The process-wide registry.
pub fn default_registry() -> Arc<MiddlewareRegistry> {
    DEFAULT_REGISTRY
        .get_or_init(|| Arc::new(MiddlewareRegistry::new()))
        .clone()
}

/// Register a middleware with the process-wide registry.
pub fn register_middleware(
    name: impl Into<String>,
    middleware: SharedMiddleware,
) -> Result<(), RegistryError> {
    default_registry().register(name, middleware)
}
