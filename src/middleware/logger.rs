//! Request logging middleware.

use std::time::Instant;

use axum::body::HttpBody as _;
use axum::http::HeaderValue;

use super::chain::{from_fn, SharedMiddleware};
use super::handler::Handler;
use super::request_id::X_REQUEST_ID;

/// Logs the start and completion of every request.
pub fn logger() -> SharedMiddleware {
    from_fn(|next: Handler| {
        Handler::from_fn(move |req| {
            let next = next.clone();
            async move {
                let start = Instant::now();
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                let request_id = req
                    .headers()
                    .get(&X_REQUEST_ID)
                    .and_then(|v: &HeaderValue| v.to_str().ok())
                    .map(str::to_string);

                tracing::info!(
                    method = %method,
                    path = %path,
                    request_id = ?request_id,
                    "request started"
                );

                let res = next.handle(req).await;

                tracing::info!(
                    method = %method,
                    path = %path,
                    status = res.status().as_u16(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    bytes = ?res.body().size_hint().exact(),
                    "request completed"
                );

                res
            }
        })
    })
}
