//! The route record.
//!
//! A route is built once from an [`EndpointConfig`] and never changes shape
//! afterwards. The only mutable part is the composed handler, which is
//! replaced wholesale through an atomic pointer swap so requests in flight
//! always see either the old or the new handler, never a partial one.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::http::{uri::InvalidUri, HeaderMap, HeaderName, HeaderValue, Uri};
use url::Url;

use crate::config::EndpointConfig;
use crate::middleware::{Handler, MiddlewareChain};
use crate::routing::router::RouterError;

/// Errors building the outgoing request URI from a route target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("target {0} has no host")]
    MissingHost(String),

    #[error("target is not a valid request URI: {0}")]
    Uri(#[from] InvalidUri),
}

/// A configured `(path, method)` mapping to a backend.
pub struct Route {
    original_path: String,
    target: Url,
    method: String,
    headers: HeaderMap,
    allowed_headers: Vec<HeaderName>,
    middleware_names: Vec<String>,
    middlewares: MiddlewareChain,
    handler: ArcSwapOption<Handler>,
}

impl Route {
    /// Build a route from its endpoint definition.
    ///
    /// Middleware names are recorded but not resolved; see
    /// [`Router::with_registry`](crate::routing::Router::with_registry).
    pub fn from_endpoint(endpoint: &EndpointConfig) -> Result<Self, RouterError> {
        let target = Url::parse(&endpoint.target).map_err(|source| RouterError::InvalidTargetUrl {
            path: endpoint.path.clone(),
            method: endpoint.method.clone(),
            target: endpoint.target.clone(),
            source,
        })?;

        // Sort names so the injected header order does not depend on map iteration.
        let mut names: Vec<&String> = endpoint.headers.keys().collect();
        names.sort();

        let mut headers = HeaderMap::new();
        for name in names {
            let header_name = parse_header_name(&endpoint.path, name)?;
            for value in &endpoint.headers[name] {
                let header_value =
                    HeaderValue::from_str(value).map_err(|_| RouterError::InvalidHeaderValue {
                        path: endpoint.path.clone(),
                        name: name.clone(),
                    })?;
                headers.append(header_name.clone(), header_value);
            }
        }

        let allowed_headers = endpoint
            .allowed_headers
            .iter()
            .map(|name| parse_header_name(&endpoint.path, name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            original_path: endpoint.path.clone(),
            target,
            method: endpoint.method.clone(),
            headers,
            allowed_headers,
            middleware_names: endpoint.middlewares.clone(),
            middlewares: MiddlewareChain::new(),
            handler: ArcSwapOption::empty(),
        })
    }

    pub fn path(&self) -> &str {
        &self.original_path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Headers injected into every forwarded request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Inbound headers permitted through to the backend.
    pub fn allowed_headers(&self) -> &[HeaderName] {
        &self.allowed_headers
    }

    /// Middleware names as configured.
    pub fn middleware_names(&self) -> &[String] {
        &self.middleware_names
    }

    /// The resolved route-specific chain.
    pub fn middlewares(&self) -> &MiddlewareChain {
        &self.middlewares
    }

    pub(crate) fn set_middlewares(&mut self, chain: MiddlewareChain) {
        self.middlewares = chain;
    }

    /// The fully composed handler, if one has been installed.
    pub fn handler(&self) -> Option<Arc<Handler>> {
        self.handler.load_full()
    }

    pub(crate) fn store_handler(&self, handler: Handler) {
        self.handler.store(Some(Arc::new(handler)));
    }

    /// The URI a request on this route is forwarded to.
    ///
    /// Scheme, host, path and query come from the target; the inbound path
    /// is discarded. An inbound query is appended to the target's.
    pub fn outgoing_uri(&self, inbound_query: Option<&str>) -> Result<Uri, TargetError> {
        let host = self
            .target
            .host_str()
            .ok_or_else(|| TargetError::MissingHost(self.target.to_string()))?;

        let mut uri = format!("{}://{}", self.target.scheme(), host);
        if let Some(port) = self.target.port() {
            uri.push(':');
            uri.push_str(&port.to_string());
        }
        uri.push_str(self.target.path());

        let target_query = self.target.query().unwrap_or_default();
        let inbound_query = inbound_query.unwrap_or_default();
        match (target_query.is_empty(), inbound_query.is_empty()) {
            (true, true) => {}
            (false, true) => {
                uri.push('?');
                uri.push_str(target_query);
            }
            (true, false) => {
                uri.push('?');
                uri.push_str(inbound_query);
            }
            (false, false) => {
                uri.push('?');
                uri.push_str(target_query);
                uri.push('&');
                uri.push_str(inbound_query);
            }
        }

        Ok(Uri::try_from(uri)?)
    }
}

fn parse_header_name(path: &str, name: &str) -> Result<HeaderName, RouterError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| RouterError::InvalidHeaderName {
        path: path.to_string(),
        name: name.to_string(),
    })
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.original_path)
            .field("method", &self.method)
            .field("target", &self.target.as_str())
            .field("allowed_headers", &self.allowed_headers)
            .field("middlewares", &self.middleware_names)
            .field("has_handler", &self.handler.load().is_some())
            .finish()
    }
}
