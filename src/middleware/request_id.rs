//! Request ID middleware.
//!
//! Tags each request with a fresh UUID v4 in `X-Request-Id`, on the request
//! before delegating (so it reaches the backend when the route allows the
//! header) and on the response.

use axum::http::{HeaderName, HeaderValue};
use uuid::Uuid;

use super::chain::{from_fn, SharedMiddleware};
use super::handler::Handler;

/// Header carrying the request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn request_id() -> SharedMiddleware {
    from_fn(|next: Handler| {
        Handler::from_fn(move |mut req| {
            let next = next.clone();
            async move {
                let id = Uuid::new_v4().to_string();
                // A hyphenated UUID is always a valid header value.
                let value = HeaderValue::from_str(&id)
                    .unwrap_or_else(|_| HeaderValue::from_static("unknown"));

                req.headers_mut().insert(X_REQUEST_ID.clone(), value.clone());
                let mut res = next.handle(req).await;
                res.headers_mut().insert(X_REQUEST_ID.clone(), value);
                res
            }
        })
    })
}
