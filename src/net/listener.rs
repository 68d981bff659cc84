//! TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured port
//! - Accept incoming TCP connections
//! - Surface accept errors without ending the accept loop

use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// The gateway's listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `addr`.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        Self::from_tcp(listener)
    }

    /// Wrap an already-bound listener.
    pub fn from_tcp(inner: TcpListener) -> Result<Self, ListenerError> {
        let local_addr = inner.local_addr().map_err(ListenerError::LocalAddr)?;
        tracing::info!(address = %local_addr, "Listener bound");
        Ok(Self { inner, local_addr })
    }

    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::trace!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
