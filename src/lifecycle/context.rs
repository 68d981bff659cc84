//! Request-scoped cancellation shared by every in-flight request.
//!
//! The server inserts a [`RequestContext`] into each request's extensions.
//! All contexts handed out by one server share a single token, which the
//! shutdown watcher cancels once the drain window has elapsed.

use tokio_util::sync::CancellationToken;

/// Cancellation handle attached to every request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
}

impl RequestContext {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A context whose token is already cancelled.
    pub fn cancelled_context() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self { token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
