//! HTTP server and graceful shutdown.
//!
//! # Responsibilities
//! - Bind the listener and run the accept loop
//! - Serve each connection with HTTP/1.1 and HTTP/2 support
//! - Wire up the ambient layers (tracing, write deadline, request context)
//! - Drain connections on shutdown, then force them closed
//!
//! # Write Deadline
//! A request still running after `write_timeout` is answered with 504. Once
//! shutdown has begun the deadline no longer applies: in-flight requests get
//! the whole drain window and are then cut with 503 by request cancellation.
//!
//! # Shutdown Sequence
//! ```text
//! lifecycle token cancelled
//!     → stop accepting, close idle keep-alive connections
//!     → wait for open connections, at most shutdown_timeout
//!     → cancel the shared request token (in-flight requests answer 503)
//!     → wait FORCE_CLOSE_GRACE, then drop whatever is left
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
    service::TowerToHyperService,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::lifecycle::RequestContext;
use crate::middleware::Handler;
use crate::net::{ConnectionTracker, Listener, ListenerError};

/// How long cancelled requests get to flush their 503 before their
/// connections are dropped.
pub const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

type ConnectionBuilder = auto::Builder<TokioExecutor>;
type AppService = TowerToHyperService<axum::Router>;

/// The gateway's HTTP server.
pub struct Server {
    config: GatewayConfig,
    handler: Handler,
}

impl Server {
    pub fn new(config: GatewayConfig, handler: Handler) -> Self {
        Self { config, handler }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Bind `0.0.0.0:<port>` and serve until `lifecycle` is cancelled and
    /// shutdown has completed.
    pub async fn start(&self, lifecycle: CancellationToken) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = Listener::bind(addr).await?;
        self.run(listener, lifecycle).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(
        &self,
        listener: TcpListener,
        lifecycle: CancellationToken,
    ) -> Result<(), ServerError> {
        let listener = Listener::from_tcp(listener)?;
        self.run(listener, lifecycle).await
    }

    async fn run(
        &self,
        listener: Listener,
        lifecycle: CancellationToken,
    ) -> Result<(), ServerError> {
        tracing::info!(
            address = %listener.local_addr(),
            read_timeout = ?self.config.read_timeout(),
            write_timeout = ?self.config.write_timeout(),
            shutdown_timeout = ?self.config.shutdown_timeout(),
            "Gateway listening"
        );

        let tracker = ConnectionTracker::new();
        let requests = CancellationToken::new();
        let force_close = CancellationToken::new();

        let app = self.build_app(RequestContext::new(requests.clone()), lifecycle.clone());
        let acceptor = Acceptor {
            builder: Arc::new(self.connection_builder()),
            service: TowerToHyperService::new(app),
            tracker: tracker.clone(),
            lifecycle: lifecycle.clone(),
            force_close: force_close.clone(),
        };

        tokio::join!(
            acceptor.run(listener),
            drain(
                tracker,
                lifecycle,
                requests,
                force_close,
                self.config.shutdown_timeout()
            ),
        );

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Build the Axum service with all ambient layers.
    fn build_app(&self, context: RequestContext, lifecycle: CancellationToken) -> axum::Router {
        let handler = write_deadline(self.handler.clone(), self.config.write_timeout(), lifecycle);

        axum::Router::new()
            .fallback_service(handler)
            .layer(Extension(context))
            .layer(TraceLayer::new_for_http())
    }

    fn connection_builder(&self) -> ConnectionBuilder {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.read_timeout());
        builder
    }
}

fn gateway_timeout() -> Response {
    (StatusCode::GATEWAY_TIMEOUT, "Gateway timeout").into_response()
}

/// Answer 504 when `handler` runs past `deadline`, unless shutdown starts
/// first; from then on the drain window bounds the request instead.
fn write_deadline(handler: Handler, deadline: Duration, lifecycle: CancellationToken) -> Handler {
    Handler::from_fn(move |req| {
        let response = handler.handle(req);
        let lifecycle = lifecycle.clone();
        async move {
            tokio::pin!(response);
            tokio::select! {
                biased;
                res = &mut response => res,
                _ = lifecycle.cancelled() => response.await,
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!(deadline = ?deadline, "Write deadline exceeded");
                    gateway_timeout()
                }
            }
        }
    })
}

/// Everything a connection task needs, shared across the accept loop.
struct Acceptor {
    builder: Arc<ConnectionBuilder>,
    service: AppService,
    tracker: ConnectionTracker,
    lifecycle: CancellationToken,
    force_close: CancellationToken,
}

impl Acceptor {
    /// Accept until the lifecycle token is cancelled. The listener is
    /// dropped on exit so no new connection is queued while draining.
    async fn run(self, listener: Listener) {
        loop {
            tokio::select! {
                biased;
                _ = self.lifecycle.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
        tracing::debug!("Accept loop stopped");
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let guard = self.tracker.track();
        let builder = Arc::clone(&self.builder);
        let service = self.service.clone();
        let lifecycle = self.lifecycle.clone();
        let force_close = self.force_close.clone();

        tokio::spawn(async move {
            let conn = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let mut draining = false;
            loop {
                tokio::select! {
                    res = conn.as_mut() => {
                        if let Err(e) = res {
                            tracing::debug!(
                                connection_id = %guard.id(),
                                peer_addr = %peer,
                                error = %e,
                                "Connection error"
                            );
                        }
                        break;
                    }
                    _ = lifecycle.cancelled(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                    _ = force_close.cancelled() => {
                        tracing::debug!(
                            connection_id = %guard.id(),
                            peer_addr = %peer,
                            "Connection force-closed"
                        );
                        break;
                    }
                }
            }
            drop(guard);
        });
    }
}

/// Drive shutdown once the lifecycle token is cancelled.
async fn drain(
    tracker: ConnectionTracker,
    lifecycle: CancellationToken,
    requests: CancellationToken,
    force_close: CancellationToken,
    shutdown_timeout: Duration,
) {
    lifecycle.cancelled().await;
    tracing::info!(
        open_connections = tracker.active_count(),
        timeout = ?shutdown_timeout,
        "Shutting down, draining connections"
    );

    if tokio::time::timeout(shutdown_timeout, tracker.wait_idle())
        .await
        .is_ok()
    {
        tracing::info!("All connections drained");
        return;
    }

    tracing::warn!(
        open_connections = tracker.active_count(),
        "Shutdown timeout elapsed, cancelling in-flight requests"
    );
    requests.cancel();

    if tokio::time::timeout(FORCE_CLOSE_GRACE, tracker.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            open_connections = tracker.active_count(),
            "Forcing remaining connections closed"
        );
        force_close.cancel();
        tracker.wait_idle().await;
    }
}
