//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or SIGTERM
//! - Translate the first one into cancellation of the lifecycle token
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The server only ever sees the token, never the signal

use tokio_util::sync::CancellationToken;

/// Wait for a termination signal.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Cancel `lifecycle` on the first termination signal.
pub async fn cancel_on_signal(lifecycle: CancellationToken) {
    tokio::select! {
        _ = shutdown_signal() => lifecycle.cancel(),
        _ = lifecycle.cancelled() => {}
    }
}
