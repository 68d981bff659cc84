//! Cross-Origin Resource Sharing middleware.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
};

use super::chain::{from_fn, SharedMiddleware};
use super::handler::Handler;

/// CORS policy.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_methods: Vec<Method>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds; 0 omits the header.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
            ],
            allow_headers: vec![
                "Origin".to_string(),
                "Content-Type".to_string(),
                "Accept".to_string(),
                "Authorization".to_string(),
            ],
            allow_credentials: true,
            max_age: 86_400,
        }
    }
}

/// Precomputed header values so the per-request path does no formatting.
struct CorsHeaders {
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    allow_credentials: bool,
    max_age: Option<HeaderValue>,
}

impl CorsHeaders {
    fn from_config(config: &CorsConfig) -> Self {
        let join = |items: Vec<&str>| -> Option<HeaderValue> {
            if items.is_empty() {
                return None;
            }
            HeaderValue::from_str(&items.join(", ")).ok()
        };

        Self {
            allow_methods: join(config.allow_methods.iter().map(Method::as_str).collect()),
            allow_headers: join(config.allow_headers.iter().map(String::as_str).collect()),
            allow_credentials: config.allow_credentials,
            max_age: (config.max_age > 0).then(|| HeaderValue::from(config.max_age)),
        }
    }
}

/// Build a CORS middleware; `None` uses [`CorsConfig::default`].
pub fn cors(config: Option<CorsConfig>) -> SharedMiddleware {
    let headers = Arc::new(CorsHeaders::from_config(&config.unwrap_or_default()));

    from_fn(move |next: Handler| {
        let headers = headers.clone();
        Handler::from_fn(move |req| {
            let next = next.clone();
            let headers = headers.clone();
            async move {
                let origin = req.headers().get(header::ORIGIN).cloned();

                if req.method() == Method::OPTIONS {
                    let mut res = StatusCode::NO_CONTENT.into_response();
                    let out = res.headers_mut();
                    out.insert(
                        header::ACCESS_CONTROL_ALLOW_ORIGIN,
                        origin.unwrap_or_else(|| HeaderValue::from_static("")),
                    );
                    if let Some(v) = &headers.allow_methods {
                        out.insert(header::ACCESS_CONTROL_ALLOW_METHODS, v.clone());
                    }
                    if let Some(v) = &headers.allow_headers {
                        out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, v.clone());
                    }
                    if headers.allow_credentials {
                        out.insert(
                            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                            HeaderValue::from_static("true"),
                        );
                    }
                    if let Some(v) = &headers.max_age {
                        out.insert(header::ACCESS_CONTROL_MAX_AGE, v.clone());
                    }
                    return res;
                }

                let mut res = next.handle(req).await;
                let out = res.headers_mut();
                if let Some(origin) = origin {
                    out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                }
                if headers.allow_credentials {
                    out.insert(
                        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                        HeaderValue::from_static("true"),
                    );
                }
                res
            }
        })
    })
}
